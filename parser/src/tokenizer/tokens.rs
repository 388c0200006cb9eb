use crate::Span;

#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Operators.
    PIPE(Span),
    AMPERSAND(Span),
    TILDE(Span),

    // Repetitions.
    ASTERISK(Span),
    PLUS(Span),
    QUESTION(Span),
    /// `{n}`, `{n,}` or `{n,m}`.
    REPEAT(Span),

    // Atoms.
    DOT(Span),
    CARET(Span),
    DOLLAR(Span),
    LITERAL(Span),
    /// A backslash followed by any character except `x`.
    ESCAPE(Span),
    /// `\xHH`
    HEX_ESCAPE(Span),

    // Grouping.
    L_PAREN(Span),
    R_PAREN(Span),
    L_BRACKET(Span),
    R_BRACKET(Span),

    /// Only produced inside a character class.
    HYPHEN(Span),

    // Special tokens
    UNKNOWN(Span),
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::PIPE(span)
            | Token::AMPERSAND(span)
            | Token::TILDE(span)
            | Token::ASTERISK(span)
            | Token::PLUS(span)
            | Token::QUESTION(span)
            | Token::REPEAT(span)
            | Token::DOT(span)
            | Token::CARET(span)
            | Token::DOLLAR(span)
            | Token::LITERAL(span)
            | Token::ESCAPE(span)
            | Token::HEX_ESCAPE(span)
            | Token::L_PAREN(span)
            | Token::R_PAREN(span)
            | Token::L_BRACKET(span)
            | Token::R_BRACKET(span)
            | Token::HYPHEN(span)
            | Token::UNKNOWN(span) => span.clone(),
        }
    }

    /// Human-readable description of the token, used in error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Token::PIPE(_) => "`|`",
            Token::AMPERSAND(_) => "`&`",
            Token::TILDE(_) => "`~`",
            Token::ASTERISK(_) => "`*`",
            Token::PLUS(_) => "`+`",
            Token::QUESTION(_) => "`?`",
            Token::REPEAT(_) => "counted repetition",
            Token::DOT(_) => "`.`",
            Token::CARET(_) => "`^`",
            Token::DOLLAR(_) => "`$`",
            Token::LITERAL(_) => "literal",
            Token::ESCAPE(_) | Token::HEX_ESCAPE(_) => "escape sequence",
            Token::L_PAREN(_) => "`(`",
            Token::R_PAREN(_) => "`)`",
            Token::L_BRACKET(_) => "`[`",
            Token::R_BRACKET(_) => "`]`",
            Token::HYPHEN(_) => "`-`",
            Token::UNKNOWN(_) => "unknown token",
        }
    }
}

/*! Implements the regular expression tokenizer.

Tokenization is the first step in the parsing process. The tokenizer takes
the pattern and produces a sequence of tokens that is later processed by the
parser. Each token is represented by a variant of the [`Token`] type.
*/

use logos::Logos;

use crate::Span;

mod tokens;

pub use tokens::Token;


/// Takes a pattern and produces a sequence of tokens.
///
/// The tokenizer has two modes of operation: normal mode and class mode.
///
/// In normal mode the tokenizer recognizes all the metacharacters of the
/// regular expression syntax. In class mode, which applies between `[` and
/// `]`, most metacharacters lose their special meaning: `[.*]` is a class
/// with two literal characters, while `-` becomes meaningful because it
/// separates the two ends of a range.
///
/// The tokenizer is unable to know whether a `[` opens a class, only the
/// parser can know that. Therefore, it is the parser's responsibility to
/// switch the tokenizer to class mode after consuming the opening bracket.
/// This is done by invoking [`Tokenizer::enter_class_mode`]. The tokenizer
/// automatically reverts to normal mode when it finds the closing bracket.
pub struct Tokenizer<'src> {
    source: &'src str,
    mode: Mode<'src>,
    /// Absolute offset within the pattern where the current lexer started.
    /// Spans reported by the lexer are relative to that point, so they must
    /// be displaced by this amount.
    lexer_starting_pos: usize,
}

impl<'src> Tokenizer<'src> {
    /// Creates a new [`Tokenizer`].
    pub fn new(source: &'src str) -> Self {
        // Can't handle patterns greater than the maximum span size.
        assert!(source.len() < Span::MAX);
        Self {
            source,
            lexer_starting_pos: 0,
            mode: Mode::Normal(NormalToken::lexer(source)),
        }
    }

    /// Returns the pattern passed to the tokenizer.
    #[inline]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> Option<Token> {
        match &mut self.mode {
            Mode::Normal(lexer) => {
                let token = lexer.next()?;
                let span =
                    Span::from(lexer.span()).offset(self.lexer_starting_pos);
                Some(match token {
                    Ok(token) => convert_normal_token(token, span),
                    Err(()) => Token::UNKNOWN(span),
                })
            }
            Mode::Class(lexer) => {
                let token = lexer.next()?;
                let end = lexer.span().end;
                let span =
                    Span::from(lexer.span()).offset(self.lexer_starting_pos);
                match token {
                    Ok(ClassToken::RBracket) => {
                        // The class is closed, the rest of the pattern is
                        // tokenized in normal mode.
                        self.lexer_starting_pos += end;
                        self.mode = Mode::Normal(NormalToken::lexer(
                            &self.source[self.lexer_starting_pos..],
                        ));
                        Some(Token::R_BRACKET(span))
                    }
                    Ok(token) => Some(convert_class_token(token, span)),
                    Err(()) => Some(Token::UNKNOWN(span)),
                }
            }
        }
    }

    /// Switches the tokenizer to class mode.
    ///
    /// The parser must invoke this function after processing the opening
    /// bracket (`[`) of a class. The tokenizer will automatically revert
    /// back to normal mode when encounters the closing bracket (`]`).
    ///
    /// # Panics
    ///
    /// If the tokenizer is not currently in normal mode.
    pub fn enter_class_mode(&mut self) {
        self.lexer_starting_pos += match &self.mode {
            Mode::Normal(lexer) => lexer.span().end,
            mode => {
                panic!(r"enter_class_mode called from mode: {:?}", mode)
            }
        };
        self.mode = Mode::Class(ClassToken::lexer(
            &self.source[self.lexer_starting_pos..],
        ));
    }
}

/// Describes the current mode of operation for a tokenizer.
#[derive(Debug)]
enum Mode<'src> {
    Normal(logos::Lexer<'src, NormalToken>),
    Class(logos::Lexer<'src, ClassToken>),
}

/// Tokens recognized in normal mode.
#[derive(logos::Logos, Debug, PartialEq)]
enum NormalToken {
    #[token("|")]
    Pipe,
    #[token("&")]
    Ampersand,
    #[token("~")]
    Tilde,
    #[token("*")]
    Asterisk,
    #[token("+")]
    Plus,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token("^")]
    Caret,
    #[token("$")]
    Dollar,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    // A `{` that doesn't start a valid counted repetition is a literal.
    #[regex(r"\{[0-9]+(,[0-9]*)?\}")]
    Repeat,
    #[regex(r"\\x[0-9a-fA-F][0-9a-fA-F]")]
    HexEscape,
    #[regex(r"\\[^x]")]
    Escape,
    #[regex(r"[^|&~*+?.^$()\[\\]")]
    Literal,
}

/// Tokens recognized in class mode.
#[derive(logos::Logos, Debug, PartialEq)]
enum ClassToken {
    #[token("]")]
    RBracket,
    #[token("^")]
    Caret,
    #[token("-")]
    Hyphen,
    #[regex(r"\\x[0-9a-fA-F][0-9a-fA-F]")]
    HexEscape,
    #[regex(r"\\[^x]")]
    Escape,
    #[regex(r"[^\]\\^\-]")]
    Literal,
}

fn convert_normal_token(token: NormalToken, span: Span) -> Token {
    match token {
        NormalToken::Pipe => Token::PIPE(span),
        NormalToken::Ampersand => Token::AMPERSAND(span),
        NormalToken::Tilde => Token::TILDE(span),
        NormalToken::Asterisk => Token::ASTERISK(span),
        NormalToken::Plus => Token::PLUS(span),
        NormalToken::Question => Token::QUESTION(span),
        NormalToken::Dot => Token::DOT(span),
        NormalToken::Caret => Token::CARET(span),
        NormalToken::Dollar => Token::DOLLAR(span),
        NormalToken::LParen => Token::L_PAREN(span),
        NormalToken::RParen => Token::R_PAREN(span),
        NormalToken::LBracket => Token::L_BRACKET(span),
        NormalToken::Repeat => Token::REPEAT(span),
        NormalToken::HexEscape => Token::HEX_ESCAPE(span),
        NormalToken::Escape => Token::ESCAPE(span),
        NormalToken::Literal => Token::LITERAL(span),
    }
}

fn convert_class_token(token: ClassToken, span: Span) -> Token {
    match token {
        ClassToken::RBracket => Token::R_BRACKET(span),
        ClassToken::Caret => Token::CARET(span),
        ClassToken::Hyphen => Token::HYPHEN(span),
        ClassToken::HexEscape => Token::HEX_ESCAPE(span),
        ClassToken::Escape => Token::ESCAPE(span),
        ClassToken::Literal => Token::LITERAL(span),
    }
}

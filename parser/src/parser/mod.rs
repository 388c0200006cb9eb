/*! A recursive-descent parser for regular expressions.

The parser receives the sequence of tokens produced by the [`Tokenizer`] and
builds an [`Ast`]. Operators are parsed with the following precedence, from
lowest to highest:

* alternation: `a|b`
* intersection: `a&b` (only when `&` and `~` operators are enabled)
* concatenation: `ab`
* complement: `~a` (only when `&` and `~` operators are enabled)
* repetition: `a*`, `a+`, `a?`, `a{n}`, `a{n,}`, `a{n,m}`
 */

use crate::ast::{Ast, Class, ClassRange, Group, PerlClass, Repetition};
use crate::tokenizer::{Token, Tokenizer};
use crate::{Error, Span};


/// Maximum depth of nested groups, classes and complements.
const MAX_NESTING: u32 = 250;

/// Maximum value accepted in a counted repetition like `a{n,m}`.
pub const MAX_REPETITION: u32 = 1000;

const ERR_UNCLOSED_GROUP: &str = "found open group without closing `)`";
const ERR_UNOPENED_GROUP: &str = "found closing `)` without matching `(`";
const ERR_UNCLOSED_CLASS: &str = "found unclosed character class";
const ERR_EMPTY_CLASS: &str = "empty character classes are not allowed";
const ERR_REPETITION_MISSING: &str =
    "repetition operator missing expression";
const ERR_COMPLEMENT_MISSING: &str = "complement operator missing expression";
const ERR_UNEXPECTED_EOF: &str = "unexpected end of pattern";

/// Parses a regular expression and produces an [`Ast`].
///
/// ```
/// # use pire_parser::{Ast, Parser};
/// let ast = Parser::new("a|b").parse().unwrap();
/// assert_eq!(
///     ast,
///     Ast::Alternation(vec![Ast::Literal('a'), Ast::Literal('b')])
/// );
/// ```
pub struct Parser<'src> {
    tokens: Tokenizer<'src>,
    /// Token returned by the last call to `peek` and not consumed yet.
    peeked: Option<Option<Token>>,
    and_not: bool,
    depth: u32,
    groups: u32,
}

impl<'src> Parser<'src> {
    /// Creates a new parser for the given pattern.
    pub fn new(pattern: &'src str) -> Self {
        Self {
            tokens: Tokenizer::new(pattern),
            peeked: None,
            and_not: false,
            depth: 0,
            groups: 0,
        }
    }

    /// Enables or disables the `&` and `~` operators.
    ///
    /// When disabled (the default) both characters are ordinary literals.
    pub fn and_not_operators(mut self, yes: bool) -> Self {
        self.and_not = yes;
        self
    }

    /// Consumes the parser and returns the AST for the whole pattern.
    pub fn parse(mut self) -> Result<Ast, Error> {
        let ast = self.alternation()?;
        match self.bump() {
            None => Ok(ast),
            Some(Token::R_PAREN(span)) => {
                Err(syntax_error(ERR_UNOPENED_GROUP, span))
            }
            Some(token) => Err(unexpected(&token)),
        }
    }
}

// Parser private API.
impl<'src> Parser<'src> {
    fn peek(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.tokens.next_token());
        }
        self.peeked.as_ref().and_then(|token| token.as_ref())
    }

    fn bump(&mut self) -> Option<Token> {
        match self.peeked.take() {
            Some(token) => token,
            None => self.tokens.next_token(),
        }
    }

    /// Span that points to the end of the pattern.
    fn eof_span(&self) -> Span {
        let len = self.tokens.source().len() as u32;
        Span(len..len)
    }

    fn enter_nesting(&mut self, span: &Span) -> Result<(), Error> {
        if self.depth >= MAX_NESTING {
            return Err(Error::NestingLimitExceeded {
                limit: MAX_NESTING,
                span: span.clone(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    fn char_at(&self, span: &Span) -> Result<char, Error> {
        self.tokens.source()[span.range()]
            .chars()
            .next()
            .ok_or_else(|| syntax_error(ERR_UNEXPECTED_EOF, span.clone()))
    }
}

// Grammar rules.
impl<'src> Parser<'src> {
    fn alternation(&mut self) -> Result<Ast, Error> {
        let mut alternatives = vec![self.intersection()?];
        while let Some(Token::PIPE(_)) = self.peek() {
            self.bump();
            alternatives.push(self.intersection()?);
        }
        Ok(collapse(alternatives, Ast::Alternation))
    }

    fn intersection(&mut self) -> Result<Ast, Error> {
        let mut operands = vec![self.concat()?];
        if self.and_not {
            while let Some(Token::AMPERSAND(_)) = self.peek() {
                self.bump();
                operands.push(self.concat()?);
            }
        }
        Ok(collapse(operands, Ast::Intersection))
    }

    fn concat(&mut self) -> Result<Ast, Error> {
        let and_not = self.and_not;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None | Some(Token::PIPE(_)) | Some(Token::R_PAREN(_)) => break,
                Some(Token::AMPERSAND(_)) if and_not => break,
                _ => items.push(self.piece()?),
            }
        }
        Ok(match items.len() {
            0 => Ast::Empty,
            _ => collapse(items, Ast::Concat),
        })
    }

    fn piece(&mut self) -> Result<Ast, Error> {
        if self.and_not {
            if let Some(Token::TILDE(span)) = self.peek() {
                let span = span.clone();
                self.bump();
                match self.peek() {
                    None
                    | Some(Token::PIPE(_))
                    | Some(Token::R_PAREN(_))
                    | Some(Token::AMPERSAND(_)) => {
                        return Err(syntax_error(ERR_COMPLEMENT_MISSING, span))
                    }
                    _ => {}
                }
                self.enter_nesting(&span)?;
                let operand = self.piece()?;
                self.exit_nesting();
                return Ok(Ast::Complement(Box::new(operand)));
            }
        }

        let mut ast = self.atom()?;

        loop {
            let (min, max) = match self.peek() {
                Some(Token::ASTERISK(_)) => (0, None),
                Some(Token::PLUS(_)) => (1, None),
                Some(Token::QUESTION(_)) => (0, Some(1)),
                Some(Token::REPEAT(span)) => {
                    let span = span.clone();
                    counted_repetition(self.tokens.source(), span)?
                }
                _ => break,
            };
            self.bump();
            ast = Ast::Repetition(Box::new(Repetition { ast, min, max }));
        }

        Ok(ast)
    }

    fn atom(&mut self) -> Result<Ast, Error> {
        let token = match self.bump() {
            Some(token) => token,
            None => {
                return Err(syntax_error(ERR_UNEXPECTED_EOF, self.eof_span()))
            }
        };
        match token {
            Token::LITERAL(span) => Ok(Ast::Literal(self.char_at(&span)?)),
            Token::DOT(_) => Ok(Ast::Dot),
            Token::CARET(_) => Ok(Ast::Begin),
            Token::DOLLAR(_) => Ok(Ast::End),
            // Without the `&` and `~` operators these are plain characters.
            Token::AMPERSAND(_) => Ok(Ast::Literal('&')),
            Token::TILDE(_) => Ok(Ast::Literal('~')),
            Token::HEX_ESCAPE(span) => {
                Ok(Ast::Literal(self.hex_escape(&span)?))
            }
            Token::ESCAPE(span) => match self.escape(&span)? {
                Escape::Char(c) => Ok(Ast::Literal(c)),
                Escape::Class(class, negated) => Ok(Ast::Class(Class {
                    negated,
                    ranges: class.ranges(),
                })),
            },
            Token::L_PAREN(span) => self.group(span),
            Token::L_BRACKET(span) => self.class(span),
            Token::ASTERISK(span)
            | Token::PLUS(span)
            | Token::QUESTION(span)
            | Token::REPEAT(span) => {
                Err(syntax_error(ERR_REPETITION_MISSING, span))
            }
            Token::UNKNOWN(span) => Err(self.unknown(span)),
            token => Err(unexpected(&token)),
        }
    }

    fn group(&mut self, open: Span) -> Result<Ast, Error> {
        self.enter_nesting(&open)?;
        self.groups += 1;
        let index = self.groups;
        let ast = self.alternation()?;
        self.exit_nesting();
        match self.bump() {
            Some(Token::R_PAREN(_)) => {
                Ok(Ast::Group(Box::new(Group { index, ast })))
            }
            _ => Err(syntax_error(ERR_UNCLOSED_GROUP, open)),
        }
    }

    fn class(&mut self, open: Span) -> Result<Ast, Error> {
        // The opening bracket was just consumed, nothing has been peeked
        // after it.
        self.tokens.enter_class_mode();

        let mut negated = false;
        let mut ranges = Vec::new();
        let mut at_start = true;

        loop {
            let token = self
                .bump()
                .ok_or_else(|| syntax_error(ERR_UNCLOSED_CLASS, open.clone()))?;

            let item = match token {
                Token::R_BRACKET(span) => {
                    if ranges.is_empty() {
                        return Err(syntax_error(
                            ERR_EMPTY_CLASS,
                            open.combine(&span),
                        ));
                    }
                    break;
                }
                Token::CARET(_) if at_start => {
                    negated = true;
                    at_start = false;
                    continue;
                }
                token => self.class_item(token)?,
            };

            at_start = false;

            let (start, start_span) = match item {
                ClassItem::Ranges(items) => {
                    ranges.extend(items);
                    continue;
                }
                ClassItem::Char(c, span) => (c, span),
            };

            if !matches!(self.peek(), Some(Token::HYPHEN(_))) {
                ranges.push(ClassRange::single(start));
                continue;
            }

            self.bump();

            match self.peek() {
                // `[a-]` the hyphen is a literal.
                Some(Token::R_BRACKET(_)) => {
                    ranges.push(ClassRange::single(start));
                    ranges.push(ClassRange::single('-'));
                }
                None => {
                    return Err(syntax_error(ERR_UNCLOSED_CLASS, open));
                }
                Some(_) => {
                    let token = self.bump().ok_or_else(|| {
                        syntax_error(ERR_UNCLOSED_CLASS, open.clone())
                    })?;
                    match self.class_item(token)? {
                        ClassItem::Char(end, end_span) => {
                            if end < start {
                                return Err(Error::InvalidClassRange {
                                    message: format!(
                                        "`{}` is greater than `{}`",
                                        start.escape_default(),
                                        end.escape_default()
                                    ),
                                    span: start_span.combine(&end_span),
                                });
                            }
                            ranges.push(ClassRange::new(start, end));
                        }
                        ClassItem::Ranges(_) => {
                            return Err(Error::InvalidClassRange {
                                message: "ranges can't end with a class"
                                    .to_string(),
                                span: start_span,
                            });
                        }
                    }
                }
            }
        }

        Ok(Ast::Class(Class { negated, ranges }))
    }

    fn class_item(&mut self, token: Token) -> Result<ClassItem, Error> {
        match token {
            Token::LITERAL(span) => {
                let c = self.char_at(&span)?;
                Ok(ClassItem::Char(c, span))
            }
            Token::CARET(span) => Ok(ClassItem::Char('^', span)),
            Token::HYPHEN(span) => Ok(ClassItem::Char('-', span)),
            Token::HEX_ESCAPE(span) => {
                let c = self.hex_escape(&span)?;
                Ok(ClassItem::Char(c, span))
            }
            Token::ESCAPE(span) => match self.escape(&span)? {
                Escape::Char(c) => Ok(ClassItem::Char(c, span)),
                Escape::Class(class, false) => {
                    Ok(ClassItem::Ranges(class.ranges()))
                }
                Escape::Class(class, true) => {
                    Ok(ClassItem::Ranges(negate_ranges(class.ranges())))
                }
            },
            Token::UNKNOWN(span) => Err(self.unknown(span)),
            token => Err(unexpected(&token)),
        }
    }

    fn escape(&self, span: &Span) -> Result<Escape, Error> {
        // The token is a backslash followed by exactly one character.
        let c = self.tokens.source()[span.range()]
            .chars()
            .nth(1)
            .ok_or_else(|| syntax_error(ERR_UNEXPECTED_EOF, span.clone()))?;
        Ok(match c {
            'n' => Escape::Char('\n'),
            'r' => Escape::Char('\r'),
            't' => Escape::Char('\t'),
            'f' => Escape::Char('\x0C'),
            'v' => Escape::Char('\x0B'),
            'd' => Escape::Class(PerlClass::Digit, false),
            'D' => Escape::Class(PerlClass::Digit, true),
            'w' => Escape::Class(PerlClass::Word, false),
            'W' => Escape::Class(PerlClass::Word, true),
            's' => Escape::Class(PerlClass::Space, false),
            'S' => Escape::Class(PerlClass::Space, true),
            c if !c.is_alphanumeric() => Escape::Char(c),
            c => {
                return Err(Error::InvalidEscapeSequence {
                    message: format!(
                        "unrecognized escape sequence `\\{}`",
                        c.escape_default()
                    ),
                    span: span.clone(),
                })
            }
        })
    }

    fn hex_escape(&self, span: &Span) -> Result<char, Error> {
        // `\xHH`, the tokenizer already checked that both digits are valid.
        let digits = &self.tokens.source()[span.start() + 2..span.end()];
        u8::from_str_radix(digits, 16).map(char::from).map_err(|err| {
            Error::InvalidEscapeSequence {
                message: err.to_string(),
                span: span.clone(),
            }
        })
    }

    fn unknown(&self, span: Span) -> Error {
        let text = &self.tokens.source()[span.range()];
        if text.starts_with('\\') {
            Error::InvalidEscapeSequence {
                message: format!("invalid escape sequence `{}`", text),
                span,
            }
        } else {
            syntax_error(format!("unexpected `{}`", text), span)
        }
    }
}

enum Escape {
    Char(char),
    Class(PerlClass, bool),
}

enum ClassItem {
    Char(char, Span),
    Ranges(Vec<ClassRange>),
}

/// Parses a counted repetition like `{2}`, `{2,}` or `{2,5}` and returns
/// its minimum and maximum.
fn counted_repetition(
    source: &str,
    span: Span,
) -> Result<(u32, Option<u32>), Error> {
    // The tokenizer guarantees the `{digits[,digits]}` shape.
    let inner = &source[span.start() + 1..span.end() - 1];

    let parse = |digits: &str| -> Result<u32, Error> {
        match digits.parse::<u32>() {
            Ok(n) if n <= MAX_REPETITION => Ok(n),
            _ => Err(Error::InvalidRepetition {
                message: format!(
                    "repetition count exceeds the limit ({})",
                    MAX_REPETITION
                ),
                span: span.clone(),
            }),
        }
    };

    let (min, max) = match inner.split_once(',') {
        None => {
            let n = parse(inner)?;
            (n, Some(n))
        }
        Some((min, "")) => (parse(min)?, None),
        Some((min, max)) => (parse(min)?, Some(parse(max)?)),
    };

    if let Some(max) = max {
        if max < min {
            return Err(Error::InvalidRepetition {
                message: format!("invalid range {{{},{}}}", min, max),
                span,
            });
        }
    }

    Ok((min, max))
}

/// Returns the ranges that cover every Unicode scalar value not covered by
/// `ranges`.
pub(crate) fn negate_ranges(mut ranges: Vec<ClassRange>) -> Vec<ClassRange> {
    ranges.sort();
    let mut result = Vec::new();
    let mut next = 0_u32;
    for range in ranges {
        let start = range.start as u32;
        if start > next {
            push_scalar_range(&mut result, next, start - 1);
        }
        next = next.max(range.end as u32 + 1);
    }
    if next <= char::MAX as u32 {
        push_scalar_range(&mut result, next, char::MAX as u32);
    }
    result
}

/// Pushes the range `start..=end`, skipping the surrogate code points that
/// are not valid `char`s.
fn push_scalar_range(result: &mut Vec<ClassRange>, start: u32, end: u32) {
    const SURROGATES: (u32, u32) = (0xD800, 0xDFFF);
    let mut push = |start: u32, end: u32| {
        if let (Some(start), Some(end)) =
            (char::from_u32(start), char::from_u32(end))
        {
            if start <= end {
                result.push(ClassRange::new(start, end));
            }
        }
    };
    if end < SURROGATES.0 || start > SURROGATES.1 {
        push(start, end);
    } else {
        if start < SURROGATES.0 {
            push(start, SURROGATES.0 - 1);
        }
        if end > SURROGATES.1 {
            push(SURROGATES.1 + 1, end);
        }
    }
}

fn collapse(mut items: Vec<Ast>, f: fn(Vec<Ast>) -> Ast) -> Ast {
    if items.len() == 1 {
        if let Some(item) = items.pop() {
            return item;
        }
    }
    f(items)
}

fn syntax_error(message: impl Into<String>, span: Span) -> Error {
    Error::SyntaxError { message: message.into(), span }
}

fn unexpected(token: &Token) -> Error {
    syntax_error(format!("unexpected {}", token.description()), token.span())
}

/*! Turns regular expressions into automata.

The [`Lexer`] parses a pattern with [`pire_parser::Parser`] and walks the
resulting AST building an [`Fsm`] bottom-up. How characters become bytes
depends on the options:

* By default patterns are Latin-1: every character in the pattern must be
  in the range `U+0000..=U+00FF` and stands for the byte with that value.
* With [`OptionFlag::Utf8`] characters are encoded as UTF-8 sequences, so
  `.` or `[^a]` match whole characters instead of single bytes.
*/

use bitmask::bitmask;
use regex_syntax::hir::{ClassUnicode, ClassUnicodeRange};
use regex_syntax::utf8::Utf8Sequences;

use pire_parser::{Ast, Class, Parser};

use crate::chars::{Char, BEGIN_MARK, END_MARK};
use crate::config::LexerConfig;
use crate::errors::Error;
use crate::fsm::Fsm;

mod glyphs;


bitmask! {
    /// Options that change how patterns are interpreted.
    #[derive(Debug)]
    pub mask Options: u8 where
    /// Each of the options accepted by the [`Lexer`].
    flags OptionFlag {
        /// Letters match both their lowercase and uppercase forms.
        CaseInsensitive = 0x01,
        /// Patterns and input are UTF-8.
        Utf8 = 0x02,
        /// Enables the `&` (intersection) and `~` (complement) operators.
        AndNot = 0x04,
        /// Letters match visually similar letters from other scripts, like
        /// the Latin `e` and the Cyrillic `е`.
        GlueSimilarGlyphs = 0x08,
    }
}

const ALL_FLAGS: [OptionFlag; 4] = [
    OptionFlag::CaseInsensitive,
    OptionFlag::Utf8,
    OptionFlag::AndNot,
    OptionFlag::GlueSimilarGlyphs,
];

impl FromIterator<OptionFlag> for Options {
    fn from_iter<I: IntoIterator<Item = OptionFlag>>(iter: I) -> Self {
        let mut options = Options::none();
        for flag in iter {
            options.set(flag);
        }
        options
    }
}

/// Builds automata from regular expressions.
///
/// ```
/// # use pire::{Lexer, OptionFlag, RelocScanner, Scanner};
/// let mut lexer = Lexer::new("hello|world");
/// lexer.add_options(OptionFlag::CaseInsensitive);
/// let scanner: RelocScanner = lexer.parse().unwrap().compile().unwrap();
/// assert!(scanner.matches("HeLLo"));
/// ```
#[derive(Debug, Clone)]
pub struct Lexer {
    pattern: String,
    options: Options,
    capture: Option<u32>,
}

impl Default for Lexer {
    /// A lexer for the empty pattern.
    fn default() -> Self {
        Self::new("")
    }
}

impl Lexer {
    /// Creates a lexer for `pattern` with no options.
    pub fn new<P: Into<String>>(pattern: P) -> Self {
        Self {
            pattern: pattern.into(),
            options: Options::none(),
            capture: None,
        }
    }

    /// Creates a lexer for `pattern` with the given options.
    pub fn with_options<P: Into<String>, O: Into<Options>>(
        pattern: P,
        options: O,
    ) -> Self {
        let mut lexer = Self::new(pattern);
        lexer.add_options(options);
        lexer
    }

    /// Creates a lexer for `pattern` with the options enabled in `config`.
    pub fn with_config<P: Into<String>>(
        pattern: P,
        config: &LexerConfig,
    ) -> Self {
        Self::with_options(pattern, config.options())
    }

    /// Enables additional options. Options already enabled stay enabled.
    pub fn add_options<O: Into<Options>>(&mut self, options: O) -> &mut Self {
        let options = options.into();
        for flag in ALL_FLAGS {
            if options.contains(flag) {
                self.options.set(flag);
            }
        }
        self
    }

    /// Marks the group with the given 1-based index as the capturing group,
    /// see [`crate::CapturingScanner`].
    pub fn add_capturing(&mut self, index: u32) -> &mut Self {
        self.capture = Some(index);
        self
    }

    /// Options currently enabled.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Parses the pattern and builds the automaton.
    ///
    /// Fails with [`Error::SyntaxError`] if the pattern is not a valid
    /// regular expression, or if it contains characters that can't be
    /// represented in the current encoding.
    pub fn parse(&self) -> Result<Fsm, Error> {
        let ast = Parser::new(&self.pattern)
            .and_not_operators(self.options.contains(OptionFlag::AndNot))
            .parse()?;
        self.lower(&ast)
    }

    fn lower(&self, ast: &Ast) -> Result<Fsm, Error> {
        match ast {
            Ast::Empty => Ok(Fsm::new()),
            Ast::Literal(c) => {
                if !self.utf8() && *c as u32 > 0xFF {
                    return Err(Error::syntax(format!(
                        "character {:?} is not a single byte, \
                         enable UTF-8 to use it",
                        c
                    )));
                }
                self.class_fsm(&self.class(&[(*c, *c)], false))
            }
            Ast::Dot => {
                if self.utf8() {
                    self.class_fsm(&self.class(&[], true))
                } else {
                    let mut fsm = Fsm::new();
                    fsm.append_dot();
                    Ok(fsm)
                }
            }
            Ast::Class(Class { negated, ranges }) => {
                let ranges: Vec<(char, char)> =
                    ranges.iter().map(|r| (r.start, r.end)).collect();
                self.class_fsm(&self.class(&ranges, *negated))
            }
            Ast::Begin => {
                let mut fsm = Fsm::new();
                fsm.append_special(BEGIN_MARK)?;
                Ok(fsm)
            }
            Ast::End => {
                let mut fsm = Fsm::new();
                fsm.append_special(END_MARK)?;
                Ok(fsm)
            }
            Ast::Group(group) => {
                let mut fsm = self.lower(&group.ast)?;
                if self.capture == Some(group.index) {
                    fsm.capture();
                }
                Ok(fsm)
            }
            Ast::Concat(items) => {
                let mut fsm = Fsm::new();
                for item in items {
                    fsm.append_fsm(&self.lower(item)?);
                }
                Ok(fsm)
            }
            Ast::Alternation(items) => {
                let mut fsm = Fsm::make_false();
                for item in items {
                    fsm.union_with(&self.lower(item)?);
                }
                Ok(fsm)
            }
            Ast::Intersection(items) => {
                let mut items = items.iter();
                let mut fsm = match items.next() {
                    Some(first) => self.lower(first)?,
                    None => return Ok(Fsm::new()),
                };
                for item in items {
                    fsm.intersect_with(&self.lower(item)?)?;
                }
                Ok(fsm)
            }
            Ast::Complement(ast) => {
                let mut fsm = self.lower(ast)?;
                fsm.complement()?;
                Ok(fsm)
            }
            Ast::Repetition(repetition) => {
                let base = self.lower(&repetition.ast)?;
                let mut fsm = base.repeated(repetition.min as usize);
                match repetition.max {
                    None => {
                        fsm.append_fsm(&base.starred());
                    }
                    Some(max) => {
                        let optional = base.united(&Fsm::new());
                        for _ in repetition.min..max {
                            fsm.append_fsm(&optional);
                        }
                    }
                }
                Ok(fsm)
            }
        }
    }

    #[inline]
    fn utf8(&self) -> bool {
        self.options.contains(OptionFlag::Utf8)
    }

    /// Builds the set of characters matched by a class, applying the
    /// options. Negation happens last, so `[^a]` in case-insensitive mode
    /// matches neither `a` nor `A`.
    fn class(&self, ranges: &[(char, char)], negated: bool) -> ClassUnicode {
        let mut class = ClassUnicode::new(
            ranges
                .iter()
                .map(|&(start, end)| ClassUnicodeRange::new(start, end)),
        );

        if self.options.contains(OptionFlag::GlueSimilarGlyphs) {
            for group in glyphs::glyph_groups() {
                let matched = group.iter().any(|&c| {
                    class.iter().any(|r| r.start() <= c && c <= r.end())
                });
                if matched {
                    class.union(&ClassUnicode::new(
                        group.iter().map(|&c| ClassUnicodeRange::new(c, c)),
                    ));
                }
            }
        }

        if self.options.contains(OptionFlag::CaseInsensitive) {
            class.case_fold_simple();
        }

        if negated {
            class.negate();
        }

        class
    }

    /// Builds an automaton that matches a single character from `class`.
    fn class_fsm(&self, class: &ClassUnicode) -> Result<Fsm, Error> {
        let mut fsm = Fsm::make_false();
        let start = fsm.initial();
        let end = fsm.add_state();
        fsm.set_final(end, true)?;

        for range in class.iter() {
            if self.utf8() {
                for sequence in Utf8Sequences::new(range.start(), range.end()) {
                    let bytes = sequence.as_slice();
                    let mut from = start;
                    for (i, byte_range) in bytes.iter().enumerate() {
                        let to = if i + 1 == bytes.len() {
                            end
                        } else {
                            fsm.add_state()
                        };
                        for byte in byte_range.start..=byte_range.end {
                            fsm.connect(from, to, Char::from(byte))?;
                        }
                        from = to;
                    }
                }
            } else {
                // Characters above U+00FF don't exist in Latin-1.
                let start_byte = range.start() as u32;
                let end_byte = (range.end() as u32).min(0xFF);
                for byte in start_byte..=end_byte {
                    fsm.connect(start, end, byte as Char)?;
                }
            }
        }

        Ok(fsm)
    }
}

use crate::config::Config;
use crate::errors::Error;
use crate::lexer::{Lexer, Options};
use crate::scanners::{RelocScanner, Scanner};

/// A compiled regular expression that looks for matches anywhere in the
/// text.
///
/// This is a shortcut for parsing a pattern with a [`Lexer`], surrounding
/// the automaton with `.*` and compiling it into a [`RelocScanner`].
///
/// ```
/// # use pire::{OptionFlag, Options, Regexp};
/// let options: Options = [OptionFlag::CaseInsensitive].into_iter().collect();
/// let re = Regexp::new("(foo|bar)+", options).unwrap();
/// assert!(re.matches("prefix fOoBaR suffix"));
/// assert!(!re.matches("bla bla bla"));
/// ```
#[derive(Clone, Debug)]
pub struct Regexp {
    scanner: RelocScanner,
}

impl Regexp {
    /// Compiles `pattern` with the given options.
    pub fn new<O: Into<Options>>(
        pattern: &str,
        options: O,
    ) -> Result<Self, Error> {
        let fsm = Lexer::with_options(pattern, options).parse()?;
        Ok(Self { scanner: fsm.surrounded().compile()? })
    }

    /// Compiles `pattern` with the lexer options and the limits of
    /// `config`, usually read with [`crate::config::load_config_from_file`].
    pub fn with_config(pattern: &str, config: &Config) -> Result<Self, Error> {
        let fsm = Lexer::with_config(pattern, &config.lexer).parse()?;
        Ok(Self { scanner: fsm.surrounded().compile_with(&config.compile)? })
    }

    /// Returns true if `text` contains a match.
    pub fn matches<T: AsRef<[u8]>>(&self, text: T) -> bool {
        self.scanner.matches(text)
    }

    /// The underlying scanner.
    pub fn scanner(&self) -> &RelocScanner {
        &self.scanner
    }
}

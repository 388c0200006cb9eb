use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::lexer::{OptionFlag, Options};

/// Configuration for building automata and scanners.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Options used when parsing patterns.
    pub lexer: LexerConfig,
    /// Limits applied while determinizing and gluing.
    pub compile: CompileConfig,
}

/// Options used when parsing patterns.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LexerConfig {
    /// Letters match both their lowercase and uppercase forms.
    pub case_insensitive: bool,
    /// Patterns and input are UTF-8 instead of Latin-1.
    pub utf8: bool,
    /// Enables the `&` and `~` operators.
    pub and_not: bool,
    /// Visually similar letters from different scripts match each other.
    pub glue_similar_glyphs: bool,
}

impl LexerConfig {
    /// Returns the lexer options equivalent to this configuration.
    pub fn options(&self) -> Options {
        let mut options = Options::none();
        if self.case_insensitive {
            options.set(OptionFlag::CaseInsensitive);
        }
        if self.utf8 {
            options.set(OptionFlag::Utf8);
        }
        if self.and_not {
            options.set(OptionFlag::AndNot);
        }
        if self.glue_similar_glyphs {
            options.set(OptionFlag::GlueSimilarGlyphs);
        }
        options
    }
}

/// Limits applied while determinizing automata and gluing scanners.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    /// Maximum number of states of any deterministic automaton built while
    /// compiling or gluing. Exceeding it produces an overflow error.
    pub max_states: usize,
    /// Minimize deterministic automata before packing them into scanners.
    pub minimize: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self { max_states: 1 << 20, minimize: true }
    }
}

/// Load config file from a given path. Path must contain a valid TOML file or
/// this function will propagate the error. Values missing in the file keep
/// their defaults.
pub fn load_config_from_file(
    config_file: &Path,
) -> Result<Config, figment::Error> {
    let config: Config =
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file_exact(config_file))
            .extract()?;
    Ok(config)
}

/// Same as [`load_config_from_file`], but the TOML content is passed
/// directly.
pub fn load_config_from_str(toml: &str) -> Result<Config, figment::Error> {
    let config: Config =
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()?;
    Ok(config)
}

use crate::core::db::{Backend, QuirkTable, ResultWalker};
use crate::core::{Result, WalkError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

/// How transcripts are rendered.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub null_text: String,
    pub column_separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            null_text: crate::core::db::walker::DEFAULT_NULL_TEXT.to_string(),
            column_separator: crate::core::db::walker::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Which backend's quirks apply.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub backend: Backend,
}

impl Config {
    /// Builds a result walker for the configured backend and rendering.
    pub fn walker(&self) -> ResultWalker {
        ResultWalker::new(QuirkTable::for_backend(self.driver.backend))
            .with_separator(self.output.column_separator.clone())
            .with_null_text(self.output.null_text.clone())
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = resultwalk::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| WalkError::Config(e.to_string()))
}

/// Default location of the configuration file, e.g.
/// `~/.config/resultwalk/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("resultwalk").join("config.toml"))
}

// src/config/mod.rs
pub mod types;

pub use self::types::{
    FingerprintConfig, FrameConfig, OutputConfig, OutputFormat, RecognizerConfig, ReportConfig,
};

use crate::error::{ReportError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "sanitizer-reports.toml";

impl ReportConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `sanitizer-reports.toml` from the working directory, falling back
    /// to defaults when the file does not exist.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads config from an explicit path. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loaded config");
                Self::parse_toml(&content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ReportError::Io {
                source,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Parses config from TOML text.
    ///
    /// # Errors
    /// Returns error on malformed TOML or mistyped fields.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

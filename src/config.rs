//! Configuration file handling for sto.
//!
//! Loads settings from `./sto.toml` or `~/.config/sto/sto.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alphabet::AlphabetKind;
use crate::stockholm::DEFAULT_BLOCK_WIDTH;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Application configuration loaded from sto.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Read sequences in digital mode with this alphabet.
    pub alphabet: Option<AlphabetKind>,
    /// Columns per block when writing.
    pub block_width: usize,
    /// Write each alignment as a single block.
    pub pfam: bool,
    /// Log level filter (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alphabet: None,
            block_width: DEFAULT_BLOCK_WIDTH,
            pfam: false,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found.
    ///
    /// Search order:
    /// 1. `./sto.toml` (current directory)
    /// 2. `~/.config/sto/sto.toml` (XDG config)
    ///
    /// Returns `(config, was_file_loaded)` tuple.
    pub fn load() -> (Self, bool) {
        if let Some(config) = Self::try_load(Path::new("sto.toml")) {
            return (config, true);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("sto").join("sto.toml");
            if let Some(config) = Self::try_load(&config_path) {
                return (config, true);
            }
        }

        (Self::default(), false)
    }

    fn try_load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    /// Load configuration from a specific path, reporting any failure.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Block width for the writer; `None` writes one block.
    pub fn write_width(&self) -> Option<usize> {
        (!self.pfam).then_some(self.block_width)
    }
}

//! Config error definitions.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, writing or querying AI configs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid config JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Failed to write config at {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize config '{name}': {source}")]
    Serialize {
        name: String,
        source: serde_json::Error,
    },

    #[error("Config '{name}' is missing required key '{key}'")]
    MissingField { name: String, key: String },
}

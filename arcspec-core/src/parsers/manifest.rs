//! `*.parser.json` manifests that register catalog implementations.
//!
//! ```json
//! {
//!   "name": "deepseek",
//!   "implementation": "openai",
//!   "description": "DeepSeek via its OpenAI-compatible endpoint",
//!   "aliases": ["ds"]
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::catalog::find_implementation;
use super::registry::{DescriptorSource, ParserDescriptor};

/// File suffix that marks a parser manifest.
pub const MANIFEST_SUFFIX: &str = ".parser.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read parser manifest at {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid parser manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Parser manifest at {path} has an empty name")]
    EmptyName { path: PathBuf },

    #[error("Parser manifest at {path} references unknown implementation '{implementation}'")]
    UnknownImplementation {
        path: PathBuf,
        implementation: String,
    },

    #[error("Invalid parser manifest glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParserManifest {
    pub name: String,
    pub implementation: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Load every manifest in `parsers_dir`, one result per file.
pub fn discover_manifests(parsers_dir: &Path) -> Vec<Result<ParserDescriptor, ManifestError>> {
    if !parsers_dir.is_dir() {
        return Vec::new();
    }

    let Some(dir) = parsers_dir.to_str() else {
        warn!(dir = %parsers_dir.display(), "Parser directory path is not valid UTF-8, skipping scan");
        return Vec::new();
    };
    let pattern = format!("{}/*{}", Pattern::escape(dir), MANIFEST_SUFFIX);

    let entries = match glob(&pattern) {
        Ok(entries) => entries,
        Err(source) => return vec![Err(ManifestError::Pattern { pattern, source })],
    };

    entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("Failed to resolve parser manifest path: {err}");
                None
            }
        })
        .filter(|path| path.is_file())
        .map(|path| load_manifest(&path))
        .collect()
}

/// Read one manifest and resolve it against the catalog.
pub fn load_manifest(manifest_path: &Path) -> Result<ParserDescriptor, ManifestError> {
    let raw = fs::read_to_string(manifest_path).map_err(|source| ManifestError::Read {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    let manifest: ParserManifest =
        serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let name = manifest.name.trim();
    if name.is_empty() {
        return Err(ManifestError::EmptyName {
            path: manifest_path.to_path_buf(),
        });
    }

    let entry = find_implementation(&manifest.implementation).ok_or_else(|| {
        ManifestError::UnknownImplementation {
            path: manifest_path.to_path_buf(),
            implementation: manifest.implementation.clone(),
        }
    })?;

    let aliases = manifest
        .aliases
        .iter()
        .map(|alias| alias.trim())
        .filter(|alias| !alias.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ParserDescriptor {
        name: name.to_string(),
        description: manifest
            .description
            .unwrap_or_else(|| entry.description.to_string()),
        aliases,
        implementation: entry.implementation.to_string(),
        source: DescriptorSource::Manifest(manifest_path.to_path_buf()),
        constructor: entry.constructor,
    })
}

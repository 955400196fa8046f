//! Directory scanning for `*.ai.json` configs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glob::{glob, Pattern};
use tracing::{debug, info, warn};

use super::record::{logical_name, AiConfig, CONFIG_SUFFIX};
use super::types::ConfigError;
use super::validation::validate_config;

/// Read every `*.ai.json` file in `configs_dir`, one result per file.
///
/// A missing or non-directory path yields no results.
pub fn scan_ai_configs(configs_dir: &Path) -> Vec<Result<AiConfig, ConfigError>> {
    if !configs_dir.is_dir() {
        return Vec::new();
    }

    let Some(dir) = configs_dir.to_str() else {
        warn!(dir = %configs_dir.display(), "Config directory path is not valid UTF-8, skipping scan");
        return Vec::new();
    };
    let pattern = format!("{}/*{}", Pattern::escape(dir), CONFIG_SUFFIX);

    let entries = match glob(&pattern) {
        Ok(entries) => entries,
        Err(source) => return vec![Err(ConfigError::Pattern { pattern, source })],
    };

    entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("Failed to resolve config path: {err}");
                None
            }
        })
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(logical_name)?
                .to_string();
            Some(load_ai_config(&path, name))
        })
        .collect()
}

/// Load a single config file under the given logical name.
pub fn load_ai_config(path: &Path, name: String) -> Result<AiConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    AiConfig::from_json(name, &raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load all AI configs in `configs_dir`, keyed by logical name.
///
/// Never fails: a missing directory gives an empty map, and files that
/// cannot be read or parsed are logged and skipped.
pub fn load_ai_configs(configs_dir: &Path) -> BTreeMap<String, AiConfig> {
    if !configs_dir.exists() {
        warn!(dir = %configs_dir.display(), "Config directory does not exist");
        return BTreeMap::new();
    }
    if !configs_dir.is_dir() {
        warn!(dir = %configs_dir.display(), "Config path is not a directory");
        return BTreeMap::new();
    }

    info!(dir = %configs_dir.display(), "Loading AI configs");

    let mut configs = BTreeMap::new();
    for result in scan_ai_configs(configs_dir) {
        match result {
            Ok(config) => {
                debug!(config = %config.name(), "Loaded AI config");
                configs.insert(config.name().to_string(), config);
            }
            Err(err) => warn!("Skipping config: {err}"),
        }
    }

    info!(total = configs.len(), "AI config loading finished");
    configs
}

/// Like [`load_ai_configs`], but drops every config that fails validation.
pub fn load_valid_ai_configs(configs_dir: &Path) -> BTreeMap<String, AiConfig> {
    let mut configs = load_ai_configs(configs_dir);

    configs.retain(|name, config| {
        let result = validate_config(config);
        if !result.valid {
            for error in &result.errors {
                warn!(config = %name, "{error}");
            }
            warn!(config = %name, "Config failed validation, skipping");
        }
        result.valid
    });

    configs
}

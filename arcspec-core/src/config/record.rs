//! AI backend configuration record.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::types::ConfigError;

/// File suffix that marks an AI backend config.
pub const CONFIG_SUFFIX: &str = ".ai.json";

pub const FRIENDLY_NAME: &str = "FriendlyName";
pub const MODEL: &str = "Model";
pub const RESPONSE_TYPE: &str = "ResponseType";
pub const TEMPERATURE: &str = "Temperature";
pub const MAX_TOKENS: &str = "MaxTokens";
pub const INTRODUCTION: &str = "Introduction";
pub const PERSONALITY: &str = "Personality";
pub const MAX_HISTORY_TOKENS: &str = "max_history_tokens";
pub const MAX_HISTORY_MESSAGES: &str = "max_history_messages";
pub const MULTIMODAL: &str = "it_multimodal_model";

/// One AI backend configuration, keyed by the logical name derived from its
/// file name.
///
/// The raw JSON object is kept as-is so validation can report type problems
/// field by field. Typed accessors return `None` when a field is absent or
/// has the wrong type.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    name: String,
    fields: Map<String, Value>,
}

impl AiConfig {
    /// Create a config from a logical name and a JSON object.
    pub fn new(name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Parse a config from JSON text. The document must be an object.
    pub fn from_json(name: impl Into<String>, raw: &str) -> Result<Self, serde_json::Error> {
        let fields: Map<String, Value> = serde_json::from_str(raw)?;
        Ok(Self::new(name, fields))
    }

    /// Logical name (the file name without `.ai.json`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields as loaded.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    /// Non-empty string value for `key`.
    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get_str(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingField {
                name: self.name.clone(),
                key: key.to_string(),
            }),
        }
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.get_str(FRIENDLY_NAME)
    }

    /// Friendly name, falling back to the logical name.
    pub fn display_name(&self) -> &str {
        self.friendly_name().unwrap_or(&self.name)
    }

    pub fn model(&self) -> Option<&str> {
        self.get_str(MODEL)
    }

    pub fn response_type(&self) -> Option<&str> {
        self.get_str(RESPONSE_TYPE)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.get_f64(TEMPERATURE)
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.get_u64(MAX_TOKENS)
    }

    pub fn introduction(&self) -> Option<&str> {
        self.get_str(INTRODUCTION)
    }

    pub fn personality(&self) -> Option<&str> {
        self.get_str(PERSONALITY)
    }

    pub fn max_history_tokens(&self) -> Option<u64> {
        self.get_u64(MAX_HISTORY_TOKENS)
    }

    pub fn max_history_messages(&self) -> Option<u64> {
        self.get_u64(MAX_HISTORY_MESSAGES)
    }

    /// Whether `it_multimodal_model` is the string `"true"` (any case).
    pub fn is_multimodal(&self) -> bool {
        self.get_str(MULTIMODAL)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    /// Path this config would be stored at inside `dir`.
    pub fn file_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}{}", self.name, CONFIG_SUFFIX))
    }

    /// Write the config as pretty-printed JSON to `<dir>/<name>.ai.json`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        let path = self.file_path(dir);
        let json = serde_json::to_string_pretty(&self.fields).map_err(|source| {
            ConfigError::Serialize {
                name: self.name.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Logical name for a config file name, if it carries the config suffix.
pub fn logical_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(CONFIG_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn demo() -> AiConfig {
        let fields = json!({
            "FriendlyName": "Demo",
            "Model": "m1",
            "ResponseType": "echo",
            "Temperature": 0.5,
            "MaxTokens": 100
        });
        AiConfig::new("demo", fields.as_object().cloned().unwrap())
    }

    #[test]
    fn test_typed_accessors() {
        let config = demo();
        assert_eq!(config.name(), "demo");
        assert_eq!(config.friendly_name(), Some("Demo"));
        assert_eq!(config.model(), Some("m1"));
        assert_eq!(config.response_type(), Some("echo"));
        assert_eq!(config.temperature(), Some(0.5));
        assert_eq!(config.max_tokens(), Some(100));
        assert_eq!(config.introduction(), None);
        assert!(!config.is_multimodal());
    }

    #[test]
    fn test_display_name_falls_back_to_logical_name() {
        let config = AiConfig::new("bare", Map::new());
        assert_eq!(config.display_name(), "bare");
        assert_eq!(demo().display_name(), "Demo");
    }

    #[test]
    fn test_require_str() {
        let config = demo();
        assert_eq!(config.require_str("Model").unwrap(), "m1");
        assert!(matches!(
            config.require_str("APIKey"),
            Err(ConfigError::MissingField { ref key, .. }) if key == "APIKey"
        ));
        // Wrong type counts as missing
        assert!(config.require_str("MaxTokens").is_err());
    }

    #[test]
    fn test_is_multimodal_is_case_insensitive() {
        let config = AiConfig::from_json("mm", r#"{"it_multimodal_model": "True"}"#).unwrap();
        assert!(config.is_multimodal());

        let config = AiConfig::from_json("mm", r#"{"it_multimodal_model": "false"}"#).unwrap();
        assert!(!config.is_multimodal());
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(AiConfig::from_json("list", "[1, 2, 3]").is_err());
    }

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("demo.ai.json"), Some("demo"));
        assert_eq!(logical_name("my.bot.ai.json"), Some("my.bot"));
        assert_eq!(logical_name("demo.json"), None);
        assert_eq!(logical_name(".ai.json"), None);
    }

    #[test]
    fn test_write_to() {
        let temp = TempDir::new().unwrap();
        let path = demo().write_to(temp.path()).unwrap();
        assert_eq!(path, temp.path().join("demo.ai.json"));

        let raw = fs::read_to_string(path).unwrap();
        let reloaded = AiConfig::from_json("demo", &raw).unwrap();
        assert_eq!(reloaded, demo());
    }
}

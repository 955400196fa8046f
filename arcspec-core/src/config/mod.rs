//! AI backend configs.
//!
//! This module provides:
//! - `AiConfig` - One `<name>.ai.json` record
//! - `load_ai_configs` - Directory scanning
//! - `validate_config` - Required/optional field checks
//! - `config_summaries` - Listing rows

mod loader;
mod record;
mod summary;
mod types;
mod validation;

pub use loader::{load_ai_config, load_ai_configs, load_valid_ai_configs, scan_ai_configs};
pub use record::{logical_name, AiConfig, CONFIG_SUFFIX};
pub use summary::{config_summaries, ConfigSummary};
pub use types::ConfigError;
pub use validation::{
    validate_config, FieldKind, ValidationResult, OPTIONAL_FIELDS, REQUIRED_FIELDS,
    TEMPERATURE_RANGE,
};

/// Field names used in `.ai.json` files.
pub mod fields {
    pub use super::record::{
        FRIENDLY_NAME, INTRODUCTION, MAX_HISTORY_MESSAGES, MAX_HISTORY_TOKENS, MAX_TOKENS, MODEL,
        MULTIMODAL, PERSONALITY, RESPONSE_TYPE, TEMPERATURE,
    };
}

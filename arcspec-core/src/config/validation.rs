//! Schema checks for AI configs.

use serde::Serialize;
use serde_json::Value;

use super::record::{
    AiConfig, FRIENDLY_NAME, INTRODUCTION, MAX_HISTORY_MESSAGES, MAX_HISTORY_TOKENS, MAX_TOKENS,
    MODEL, MULTIMODAL, PERSONALITY, RESPONSE_TYPE, TEMPERATURE,
};

/// Inclusive bounds accepted for `Temperature`.
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);

/// Primitive JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Integer => write!(f, "integer"),
        }
    }
}

pub const REQUIRED_FIELDS: &[(&str, FieldKind)] = &[
    (FRIENDLY_NAME, FieldKind::String),
    (MODEL, FieldKind::String),
    (RESPONSE_TYPE, FieldKind::String),
    (TEMPERATURE, FieldKind::Number),
    (MAX_TOKENS, FieldKind::Integer),
];

pub const OPTIONAL_FIELDS: &[(&str, FieldKind)] = &[
    (INTRODUCTION, FieldKind::String),
    (PERSONALITY, FieldKind::String),
    (MAX_HISTORY_TOKENS, FieldKind::Integer),
    (MAX_HISTORY_MESSAGES, FieldKind::Integer),
    (MULTIMODAL, FieldKind::String),
];

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Every problem found, in field-table order.
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check a config against the required/optional field table.
///
/// Collects every violation rather than stopping at the first one.
pub fn validate_config(config: &AiConfig) -> ValidationResult {
    let mut errors = Vec::new();

    for &(field, kind) in REQUIRED_FIELDS {
        match config.get(field) {
            None | Some(Value::Null) => errors.push(format!("Missing required field '{field}'")),
            Some(value) if !kind.matches(value) => errors.push(type_error(field, kind, value)),
            Some(value) => {
                if let Some(message) = range_error(field, value) {
                    errors.push(message);
                }
            }
        }
    }

    for &(field, kind) in OPTIONAL_FIELDS {
        if let Some(value) = config.get(field) {
            if !kind.matches(value) {
                errors.push(type_error(field, kind, value));
            }
        }
    }

    ValidationResult::from_errors(errors)
}

fn range_error(field: &str, value: &Value) -> Option<String> {
    match field {
        TEMPERATURE => {
            let temp = value.as_f64()?;
            let (min, max) = TEMPERATURE_RANGE;
            (!(min..=max).contains(&temp))
                .then(|| format!("Field '{field}' value {temp} is outside [{min:.1}, {max:.1}]"))
        }
        MAX_TOKENS => {
            let positive = value.as_u64().is_some_and(|tokens| tokens > 0);
            (!positive).then(|| format!("Field '{field}' value {value} must be greater than 0"))
        }
        _ => None,
    }
}

fn type_error(field: &str, expected: FieldKind, value: &Value) -> String {
    format!(
        "Field '{field}' has wrong type: expected {expected}, got {}",
        json_type_name(value)
    )
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> AiConfig {
        AiConfig::from_json("test", raw).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let result = validate_config(&config(
            r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":0.5,"MaxTokens":100}"#,
        ));
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_integer_temperature_is_accepted() {
        let result = validate_config(&config(
            r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":1,"MaxTokens":100}"#,
        ));
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_empty_config_reports_every_required_field() {
        let result = validate_config(&config("{}"));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), REQUIRED_FIELDS.len());
        for (error, (field, _)) in result.errors.iter().zip(REQUIRED_FIELDS) {
            assert!(error.contains(field), "{error} should mention {field}");
        }
    }

    #[test]
    fn test_reports_all_problems_in_one_pass() {
        let result = validate_config(&config(
            r#"{"FriendlyName":3,"Model":"m1","Temperature":5.0,"MaxTokens":0,"Personality":[]}"#,
        ));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 5);
        assert!(result.errors[0].contains("FriendlyName"));
        assert!(result.errors[1].contains("ResponseType"));
        assert!(result.errors[2].contains("Temperature"));
        assert!(result.errors[3].contains("MaxTokens"));
        assert!(result.errors[4].contains("Personality"));
    }

    #[test]
    fn test_max_tokens_must_be_integer() {
        let result = validate_config(&config(
            r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":0.5,"MaxTokens":100.0}"#,
        ));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("expected integer"));
    }

    #[test]
    fn test_negative_max_tokens() {
        let result = validate_config(&config(
            r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":0.5,"MaxTokens":-5}"#,
        ));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("greater than 0"));
    }

    #[test]
    fn test_temperature_bounds_are_inclusive() {
        for temp in ["0.0", "2.0"] {
            let raw = format!(
                r#"{{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":{temp},"MaxTokens":1}}"#
            );
            assert!(validate_config(&config(&raw)).valid);
        }
        let result = validate_config(&config(
            r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":-0.1,"MaxTokens":1}"#,
        ));
        assert!(!result.valid);
    }

    #[test]
    fn test_optional_field_types() {
        let result = validate_config(&config(
            r#"{"FriendlyName":"Demo","Model":"m1","ResponseType":"echo","Temperature":0.5,"MaxTokens":1,
                "it_multimodal_model":true,"max_history_tokens":"lots","Introduction":"hi"}"#,
        ));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("max_history_tokens"));
        assert!(result.errors[1].contains("it_multimodal_model"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let result = validate_config(&config(
            r#"{"FriendlyName":null,"Model":"m1","ResponseType":"echo","Temperature":0.5,"MaxTokens":1}"#,
        ));
        assert_eq!(result.errors, vec!["Missing required field 'FriendlyName'".to_string()]);
    }
}

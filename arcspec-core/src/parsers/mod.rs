//! Response parsers and their registry.
//!
//! A parser turns one input string into one response string for a given
//! [`AiConfig`]. Implementations are compiled in (see [`catalog`]) and made
//! available under names and aliases declared by the built-in table or by
//! `*.parser.json` manifests in a plugin directory (see [`registry`]).

pub mod catalog;
pub mod echo;
pub mod manifest;
pub mod openai;
pub mod registry;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{AiConfig, ConfigError, ValidationResult};

pub use catalog::{find_implementation, CatalogEntry, ParserConstructor, BUILTIN_PARSERS};
pub use echo::EchoParser;
pub use manifest::{discover_manifests, load_manifest, ManifestError, ParserManifest};
pub use openai::OpenAiParser;
pub use registry::{
    load_parsers, CollisionPolicy, DescriptorSource, ParserDescriptor, ParserRegistry,
    RegistryError,
};

/// Errors from constructing or running a parser.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration for parser '{parser}': {}", .errors.join("; "))]
    InvalidConfig { parser: String, errors: Vec<String> },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// Descriptive information about a constructed parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Friendly name of the config the parser was built from.
    pub name: String,
    /// Implementation name (e.g. `echo`, `openai`).
    #[serde(rename = "type")]
    pub parser_type: String,
    /// Model identifier from the config.
    pub model: String,
    /// Implementation-specific extras.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl ModelInfo {
    pub fn new(config: &AiConfig, parser_type: &str) -> Self {
        Self {
            name: config.display_name().to_string(),
            parser_type: parser_type.to_string(),
            model: config.model().unwrap_or_default().to_string(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Capability contract every response parser implements.
///
/// `parse` is blocking. Parsers are `Send` so callers can move them onto
/// worker threads; any concurrency is the caller's business.
pub trait Parser: Send {
    /// Produce a response for `input`.
    fn parse(&mut self, input: &str) -> Result<String, ParserError>;

    /// Name, type and model of this parser, plus implementation extras.
    fn model_info(&self) -> ModelInfo;

    /// Constraints beyond the generic config schema.
    fn validate_config(&self) -> ValidationResult {
        ValidationResult::ok()
    }

    /// Forget any conversation state. No-op for stateless parsers.
    fn clear_history(&mut self) {}
}

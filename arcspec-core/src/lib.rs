//! ArcSpec Core Library
//!
//! Loads AI backend configs and dispatches input to response parsers.
//! It includes:
//!
//! - `<name>.ai.json` config loading and schema validation
//! - A parser registry built from compiled-in implementations and
//!   `*.parser.json` manifests
//! - The `Parser` capability contract and its built-in implementations
//! - Bounded conversation history for chat-style parsers
//!
//! ```no_run
//! use std::path::Path;
//! use arcspec_core::{load_ai_configs, load_parsers, validate_config};
//!
//! let configs = load_ai_configs(Path::new("configs"));
//! let registry = load_parsers(Path::new("parsers"));
//!
//! if let Some(config) = configs.get("demo") {
//!     assert!(validate_config(config).valid);
//!     let mut parser = registry.create_parser_for(config)?;
//!     println!("{}", parser.parse("hi")?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod history;
pub mod parsers;

// Re-exports for convenience
pub use config::{
    config_summaries, load_ai_configs, load_valid_ai_configs, validate_config, AiConfig,
    ConfigError, ConfigSummary, ValidationResult,
};
pub use history::{HistoryManager, HistorySummary, MessageRole};
pub use parsers::{
    load_parsers, CollisionPolicy, DescriptorSource, ModelInfo, Parser, ParserDescriptor,
    ParserError, ParserRegistry, RegistryError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

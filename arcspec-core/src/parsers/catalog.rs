//! Compiled-in parser implementations.
//!
//! Manifests and the built-in table refer to implementations by the
//! `implementation` key listed here.

use crate::config::AiConfig;

use super::echo::{EchoParser, ECHO_PARSER};
use super::openai::{OpenAiParser, OPENAI_PARSER};
use super::{Parser, ParserError};

/// Builds a parser from a config.
pub type ParserConstructor = fn(&AiConfig) -> Result<Box<dyn Parser>, ParserError>;

/// One available implementation and its default registration.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub implementation: &'static str,
    pub description: &'static str,
    pub aliases: &'static [&'static str],
    pub constructor: ParserConstructor,
}

pub const BUILTIN_PARSERS: &[CatalogEntry] = &[
    CatalogEntry {
        implementation: ECHO_PARSER,
        description: "Returns the input unchanged",
        aliases: &["mirror"],
        constructor: EchoParser::boxed,
    },
    CatalogEntry {
        implementation: OPENAI_PARSER,
        description: "OpenAI-compatible chat completions API",
        aliases: &["openai-compatible", "closeai"],
        constructor: OpenAiParser::boxed,
    },
];

/// Look up a compiled-in implementation by key.
pub fn find_implementation(implementation: &str) -> Option<&'static CatalogEntry> {
    BUILTIN_PARSERS
        .iter()
        .find(|entry| entry.implementation == implementation)
}

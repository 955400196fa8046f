//! Parser that answers with its input.

use crate::config::AiConfig;

use super::{ModelInfo, Parser, ParserError};

pub const ECHO_PARSER: &str = "echo";

/// Returns the input unchanged. Useful for wiring checks and tests.
#[derive(Debug, Clone)]
pub struct EchoParser {
    config: AiConfig,
}

impl EchoParser {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub(crate) fn boxed(config: &AiConfig) -> Result<Box<dyn Parser>, ParserError> {
        Ok(Box::new(Self::new(config)))
    }
}

impl Parser for EchoParser {
    fn parse(&mut self, input: &str) -> Result<String, ParserError> {
        Ok(input.to_string())
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new(&self.config, ECHO_PARSER)
    }
}

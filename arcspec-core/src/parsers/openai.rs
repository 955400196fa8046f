//! OpenAI-compatible chat completions parser.
//!
//! Works with any endpoint that speaks the `/chat/completions` protocol
//! (OpenAI, DeepSeek, local gateways, ...). Conversation history is kept
//! per parser instance and trimmed by [`HistoryManager`].
//!
//! Config keys read on top of the common schema:
//! - `APIKey` (required)
//! - `BaseURL` (default `https://api.openai.com/v1`)
//! - `TopP` (default 1.0)
//! - `TimeoutSecs` (default 60)
//! - `other`, `Extra_Body` - objects merged into the request body, in that order

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{fields, AiConfig, ValidationResult, TEMPERATURE_RANGE};
use crate::history::{HistoryManager, DEFAULT_MAX_HISTORY_MESSAGES, DEFAULT_MAX_HISTORY_TOKENS};

use super::{ModelInfo, Parser, ParserError};

pub const OPENAI_PARSER: &str = "openai";

pub const API_KEY: &str = "APIKey";
pub const BASE_URL: &str = "BaseURL";
pub const TOP_P: &str = "TopP";
pub const TIMEOUT_SECS: &str = "TimeoutSecs";
pub const OTHER_PARAMS: &str = "other";
pub const EXTRA_BODY: &str = "Extra_Body";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TEMPERATURE: f64 = 0.5;
const DEFAULT_MAX_TOKENS: u64 = 1000;
const DEFAULT_TOP_P: f64 = 1.0;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct OpenAiParser {
    config: AiConfig,
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u64,
    top_p: f64,
    personality: Option<String>,
    history: HistoryManager,
}

impl std::fmt::Debug for OpenAiParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiParser")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("history", &self.history.summary())
            .finish_non_exhaustive()
    }
}

impl OpenAiParser {
    pub fn new(config: &AiConfig) -> Result<Self, ParserError> {
        let api_key = config.require_str(API_KEY)?.to_string();
        let model = config.require_str(fields::MODEL)?.to_string();

        let base_url = config.get_str(BASE_URL).unwrap_or(DEFAULT_BASE_URL);
        let endpoint = chat_completions_url(base_url).map_err(|err| ParserError::InvalidConfig {
            parser: OPENAI_PARSER.to_string(),
            errors: vec![format!("Invalid {BASE_URL} '{base_url}': {err}")],
        })?;

        let timeout = config.get_u64(TIMEOUT_SECS).unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        let max_history_tokens = config
            .max_history_tokens()
            .map_or(DEFAULT_MAX_HISTORY_TOKENS, |n| n as usize);
        let max_history_messages = config
            .max_history_messages()
            .map_or(DEFAULT_MAX_HISTORY_MESSAGES, |n| n as usize);
        let mut history = HistoryManager::new(max_history_tokens, max_history_messages);

        let personality = config
            .personality()
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        if let Some(personality) = &personality {
            history.set_system_message(personality);
        }

        info!(model = %model, endpoint = %endpoint, "OpenAI parser initialised");

        Ok(Self {
            config: config.clone(),
            client,
            api_key,
            endpoint,
            model,
            temperature: config.temperature().unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: config.max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: config.get_f64(TOP_P).unwrap_or(DEFAULT_TOP_P),
            personality,
            history,
        })
    }

    pub(crate) fn boxed(config: &AiConfig) -> Result<Box<dyn Parser>, ParserError> {
        Ok(Box::new(Self::new(config)?))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Request body for the current history.
    pub fn request_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.history.messages_for_api(),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "top_p": self.top_p,
        });

        if let Some(map) = body.as_object_mut() {
            for key in [OTHER_PARAMS, EXTRA_BODY] {
                if let Some(Value::Object(extra)) = self.config.get(key) {
                    for (k, v) in extra {
                        map.insert(k.clone(), v.clone());
                    }
                }
            }
        }

        body
    }

    fn send(&self, body: &Value) -> Result<String, ParserError> {
        debug!(endpoint = %self.endpoint, "Sending chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(ParserError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let payload: Value = response.json()?;
        extract_content(&payload)
    }
}

impl Parser for OpenAiParser {
    fn parse(&mut self, input: &str) -> Result<String, ParserError> {
        self.history.add_user_message(input);
        let body = self.request_body();

        match self.send(&body) {
            Ok(reply) => {
                info!(chars = reply.len(), "Chat completion received");
                self.history.add_assistant_message(&reply);
                Ok(reply)
            }
            Err(err) => {
                warn!("Chat completion failed: {err}");
                self.history.pop_user_message();
                Err(err)
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        let summary = serde_json::to_value(self.history.summary()).unwrap_or(Value::Null);

        ModelInfo::new(&self.config, OPENAI_PARSER)
            .with_detail("endpoint", self.endpoint.clone())
            .with_detail("temperature", self.temperature)
            .with_detail("max_tokens", self.max_tokens)
            .with_detail("top_p", self.top_p)
            .with_detail("personality", self.personality.clone().unwrap_or_default())
            .with_detail("multimodal", self.config.is_multimodal())
            .with_detail("history", summary)
    }

    fn validate_config(&self) -> ValidationResult {
        let mut errors = Vec::new();

        let (min, max) = TEMPERATURE_RANGE;
        if !(min..=max).contains(&self.temperature) {
            errors.push(format!("Temperature {} is outside [{min:.1}, {max:.1}]", self.temperature));
        }
        if self.max_tokens == 0 {
            errors.push("MaxTokens must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            errors.push(format!("{TOP_P} {} is outside [0.0, 1.0]", self.top_p));
        }
        for key in [OTHER_PARAMS, EXTRA_BODY] {
            if let Some(value) = self.config.get(key) {
                if !value.is_object() {
                    errors.push(format!("{key} must be a JSON object"));
                }
            }
        }
        // A zero limit would trim the user's message before it is sent.
        for key in [fields::MAX_HISTORY_TOKENS, fields::MAX_HISTORY_MESSAGES] {
            match self.config.get(key) {
                None | Some(Value::Null) => {}
                Some(value) if value.as_u64().is_some_and(|n| n > 0) => {}
                Some(value) => errors.push(format!("{key} must be a positive integer, got {value}")),
            }
        }

        ValidationResult::from_errors(errors)
    }

    fn clear_history(&mut self) {
        // The system message survives a clear.
        self.history.clear();
        info!("Conversation history cleared");
    }
}

/// `<base>/chat/completions`, tolerating a trailing slash on the base.
pub fn chat_completions_url(base_url: &str) -> Result<String, url::ParseError> {
    let url = Url::parse(base_url)?;
    Ok(format!(
        "{}/chat/completions",
        url.as_str().trim_end_matches('/')
    ))
}

/// First choice's message content, trimmed.
pub fn extract_content(payload: &Value) -> Result<String, ParserError> {
    let choices = payload
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| ParserError::InvalidResponse("missing 'choices' array".to_string()))?;

    let content = choices
        .first()
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ParserError::EmptyResponse);
    }
    Ok(content.to_string())
}

/// Best-effort human message from an error response body.
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Map<String, Value>>(body)
        .ok()
        .and_then(|map| {
            map.get("error").and_then(|error| {
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .or_else(|| error.as_str())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| body.trim().to_string())
}

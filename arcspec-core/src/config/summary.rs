//! Row data for listing loaded configs.

use std::collections::BTreeMap;

use serde::Serialize;

use super::record::AiConfig;

const FRIENDLY_NAME_WIDTH: usize = 18;
const MODEL_WIDTH: usize = 23;
const INTRODUCTION_WIDTH: usize = 28;

/// One numbered row of the config listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    /// 1-based position in the listing.
    pub index: usize,
    pub name: String,
    pub friendly_name: String,
    pub model: String,
    pub introduction: String,
}

/// Build listing rows in logical-name order.
pub fn config_summaries(configs: &BTreeMap<String, AiConfig>) -> Vec<ConfigSummary> {
    configs
        .iter()
        .enumerate()
        .map(|(i, (name, config))| ConfigSummary {
            index: i + 1,
            name: name.clone(),
            friendly_name: truncate(config.display_name(), FRIENDLY_NAME_WIDTH),
            model: truncate(config.model().unwrap_or("Unknown"), MODEL_WIDTH),
            introduction: truncate(
                config.introduction().unwrap_or("No description"),
                INTRODUCTION_WIDTH,
            ),
        })
        .collect()
}

/// Shorten `text` to `width` chars, ending in `...` when cut.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

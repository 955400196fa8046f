//! Command implementations. Each writes its report to `out`.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{bail, Context, Result};
use arcspec_core::{
    config_summaries, validate_config, AiConfig, DescriptorSource, ParserRegistry,
};

const RULE_WIDTH: usize = 80;

fn find_config<'a>(configs: &'a BTreeMap<String, AiConfig>, name: &str) -> Result<&'a AiConfig> {
    configs.get(name).with_context(|| {
        let known: Vec<&str> = configs.keys().map(String::as_str).collect();
        format!(
            "No config named '{name}'. Known configs: {}",
            if known.is_empty() {
                "(none)".to_string()
            } else {
                known.join(", ")
            }
        )
    })
}

pub fn list(configs: &BTreeMap<String, AiConfig>, out: &mut impl Write) -> Result<()> {
    if configs.is_empty() {
        writeln!(out, "No AI configs found")?;
        return Ok(());
    }

    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(
        out,
        "{:<4} {:<20} {:<25} {:<30}",
        "#", "FriendlyName", "Model", "Introduction"
    )?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for row in config_summaries(configs) {
        writeln!(
            out,
            "{:<4} {:<20} {:<25} {:<30}",
            row.index, row.friendly_name, row.model, row.introduction
        )?;
    }
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    Ok(())
}

pub fn validate(
    configs: &BTreeMap<String, AiConfig>,
    name: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let selected: Vec<&AiConfig> = match name {
        Some(name) => vec![find_config(configs, name)?],
        None => configs.values().collect(),
    };

    let mut failed = 0;
    for config in &selected {
        let result = validate_config(config);
        if result.valid {
            writeln!(out, "ok      {}", config.name())?;
        } else {
            failed += 1;
            writeln!(out, "invalid {}", config.name())?;
            for error in &result.errors {
                writeln!(out, "        - {error}")?;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} config(s) failed validation", selected.len());
    }
    Ok(())
}

pub fn parsers(registry: &ParserRegistry, out: &mut impl Write) -> Result<()> {
    for descriptor in registry.descriptors() {
        let source = match &descriptor.source {
            DescriptorSource::Builtin => "built-in".to_string(),
            DescriptorSource::Manifest(path) => path.display().to_string(),
        };
        writeln!(
            out,
            "{:<16} {:<10} {}",
            descriptor.name, descriptor.implementation, descriptor.description
        )?;
        if !descriptor.aliases.is_empty() {
            writeln!(out, "{:<16} aliases: {}", "", descriptor.aliases.join(", "))?;
        }
        writeln!(out, "{:<16} source: {source}", "")?;
    }

    for error in registry.load_errors() {
        writeln!(out, "warning: {error}")?;
    }
    Ok(())
}

pub fn ask(
    configs: &BTreeMap<String, AiConfig>,
    registry: &ParserRegistry,
    name: &str,
    message: &str,
    out: &mut impl Write,
) -> Result<()> {
    let config = find_config(configs, name)?;
    let mut parser = registry
        .create_parser_for(config)
        .with_context(|| format!("Failed to initialise parser for '{name}'"))?;

    let reply = parser
        .parse(message)
        .with_context(|| format!("'{name}' failed to respond"))?;
    writeln!(out, "{reply}")?;
    Ok(())
}

pub fn info(
    configs: &BTreeMap<String, AiConfig>,
    registry: &ParserRegistry,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    let config = find_config(configs, name)?;
    let parser = registry
        .create_parser_for(config)
        .with_context(|| format!("Failed to initialise parser for '{name}'"))?;

    let json = serde_json::to_string_pretty(&parser.model_info())?;
    writeln!(out, "{json}")?;
    Ok(())
}

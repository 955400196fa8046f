//! ArcSpec command-line front end.
//!
//! Lists and validates AI configs, shows registered parsers, and sends a
//! single message through the parser a config selects.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use arcspec_core::{load_ai_configs, CollisionPolicy, ParserRegistry};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "arcspec", version, about = "AI backend configs and response parsers")]
struct Cli {
    /// Directory containing `<name>.ai.json` configs
    #[arg(long, env = "ARCSPEC_CONFIG_DIR", default_value = "configs", global = true)]
    configs: PathBuf,

    /// Directory containing `*.parser.json` manifests
    #[arg(long, env = "ARCSPEC_PARSER_DIR", default_value = "parsers", global = true)]
    parsers: PathBuf,

    /// How to resolve parser name/alias collisions
    #[arg(long, value_enum, default_value_t = Policy::LastWriteWins, global = true)]
    collisions: Policy,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List loaded configs
    List,
    /// Validate one config, or all of them
    Validate {
        /// Logical config name (file name without `.ai.json`)
        name: Option<String>,
    },
    /// List registered parsers and their aliases
    Parsers,
    /// Send one message through the parser a config selects
    Ask {
        /// Logical config name
        name: String,
        /// Message to send
        message: String,
    },
    /// Show model info for a config's parser
    Info {
        /// Logical config name
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    LastWriteWins,
    FirstWriteWins,
    Reject,
}

impl From<Policy> for CollisionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::LastWriteWins => CollisionPolicy::LastWriteWins,
            Policy::FirstWriteWins => CollisionPolicy::FirstWriteWins,
            Policy::Reject => CollisionPolicy::Reject,
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,arcspec_core=info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "Starting arcspec v{}", arcspec_core::VERSION);

    let configs = load_ai_configs(&cli.configs);
    let mut out = io::stdout().lock();

    match cli.command {
        Command::List => commands::list(&configs, &mut out),
        Command::Validate { name } => commands::validate(&configs, name.as_deref(), &mut out),
        Command::Parsers => {
            let registry = ParserRegistry::load(&cli.parsers, cli.collisions.into());
            commands::parsers(&registry, &mut out)
        }
        Command::Ask { name, message } => {
            let registry = ParserRegistry::load(&cli.parsers, cli.collisions.into());
            commands::ask(&configs, &registry, &name, &message, &mut out)
        }
        Command::Info { name } => {
            let registry = ParserRegistry::load(&cli.parsers, cli.collisions.into());
            commands::info(&configs, &registry, &name, &mut out)
        }
    }
}

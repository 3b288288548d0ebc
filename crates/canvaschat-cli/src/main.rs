//! Canvaschat CLI — entry point.
//!
//! # Commands
//!
//! - `canvaschat ask -m MESSAGE [--trace] [--json]` — single-shot answer
//! - `canvaschat chat [--trace]` — interactive REPL with conversation history
//! - `canvaschat init` — write a default config file
//! - `canvaschat status` — show configuration, keys and fallback order
//! - `canvaschat prompt` — print the composed capability prompt

mod helpers;
mod init;
mod repl;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use canvaschat_core::config::{load_config, Config};
use canvaschat_core::credentials::{CredentialProvider, EnvCredentials, LayeredCredentials};
use canvaschat_orchestrator::{Orchestrator, OrchestratorSettings};
use canvaschat_providers::registry::{find_by_name, PROVIDERS};
use canvaschat_providers::{create_adapter, AdapterSettings};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Canvaschat — answers as text or interactive HTML, across several LLM providers
#[derive(Parser)]
#[command(name = "canvaschat", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.canvaschat/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the response
    Ask {
        /// The message to answer
        #[arg(short, long)]
        message: String,

        /// Show which providers were tried
        #[arg(long, default_value_t = false)]
        trace: bool,

        /// Print the raw response envelope as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Interactive chat that keeps conversation history
    Chat {
        /// Show which providers were tried for each answer
        #[arg(long, default_value_t = false)]
        trace: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write a default configuration file
    Init,

    /// Show configuration, key status and fallback order
    Status,

    /// Print the instruction prompt sent to providers
    Prompt,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Ask {
            message,
            trace,
            json,
            logs,
        } => {
            init_logging(logs);
            let config = load_config(config_path.as_deref());
            run_ask(&config, &message, trace, json).await
        }
        Commands::Chat { trace, logs } => {
            init_logging(logs);
            let config = load_config(config_path.as_deref());
            let orchestrator = build_orchestrator(&config)?;
            repl::run(orchestrator, trace).await
        }
        Commands::Init => init::run(config_path),
        Commands::Status => status::run(config_path),
        Commands::Prompt => {
            let config = load_config(config_path.as_deref());
            let orchestrator = build_orchestrator(&config)?;
            println!("{}", orchestrator.capability_prompt());
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────
// Ask command
// ─────────────────────────────────────────────

async fn run_ask(config: &Config, message: &str, trace: bool, json: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    info!(chars = message.len(), "processing single message");
    let report = orchestrator.run(message, &[]).await;

    if json {
        let rendered = serde_json::to_string_pretty(&report.envelope)
            .context("failed to serialize response envelope")?;
        println!("{rendered}");
    } else {
        helpers::print_envelope(&report.envelope);
    }
    if trace {
        helpers::print_trace(&report);
    }

    Ok(())
}

/// Build an `Orchestrator` from the loaded configuration.
///
/// Keys from the config file take precedence over `<NAME>_API_KEY` variables.
/// Every known provider gets an adapter; the orchestrator decides per call
/// which of them have credentials.
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let settings = OrchestratorSettings::from_config(&config.orchestrator);

    if find_by_name(&settings.primary).is_none() {
        bail!("unknown primary provider: {}", settings.primary);
    }
    if find_by_name(settings.formatter_name()).is_none() {
        bail!("unknown formatter provider: {}", settings.formatter_name());
    }
    for name in &settings.fallback_order {
        if find_by_name(name).is_none() {
            warn!(provider = %name, "unknown provider in fallback order, ignoring");
        }
    }

    let credentials: Arc<dyn CredentialProvider> = Arc::new(
        LayeredCredentials::new()
            .layer(config.credentials())
            .layer(EnvCredentials),
    );

    let mut orchestrator = Orchestrator::new(credentials, settings);
    for profile in PROVIDERS {
        let provider_config = config
            .providers
            .get_by_name(profile.name)
            .cloned()
            .unwrap_or_default();
        let adapter_settings = AdapterSettings::from_config(&provider_config, &config.request);
        orchestrator = orchestrator.with_adapter(create_adapter(profile, &adapter_settings));
    }

    Ok(orchestrator)
}

/// Resolve the config path: `--config` if given, otherwise the default.
pub fn resolve_config_path(config_path: Option<PathBuf>) -> PathBuf {
    config_path.unwrap_or_else(canvaschat_core::config::get_config_path)
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("canvaschat=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! `canvaschat status` — show configuration, key status and fallback order.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use canvaschat_core::config::load_config;
use canvaschat_core::credentials::CredentialProvider;
use canvaschat_orchestrator::CAPABILITIES;
use canvaschat_providers::registry::PROVIDERS;

use crate::{build_orchestrator, resolve_config_path};

/// Run the status command.
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = resolve_config_path(config_path);
    let config = load_config(Some(&config_path));
    let orchestrator = build_orchestrator(&config)?;
    let settings = orchestrator.settings();

    println!();
    println!("{}", "🎨 Canvaschat Status".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    println!("  {:<18} {}", "Primary:".bold(), settings.primary);
    println!("  {:<18} {}", "Formatter:".bold(), settings.formatter_name());
    println!(
        "  {:<18} {}",
        "Fallback order:".bold(),
        settings.chain().join(" → ")
    );

    let candidates = orchestrator.candidate_names();
    let active = if candidates.is_empty() {
        "(none)".red().to_string()
    } else {
        candidates.join(" → ")
    };
    println!("  {:<18} {}", "Active chain:".bold(), active);

    println!(
        "  {:<18} {} | max_tokens: {} | timeout: {}s",
        "Parameters:".bold(),
        format!("temp: {}", config.request.temperature).dimmed(),
        format!("{}", config.request.max_tokens).dimmed(),
        format!("{}", config.request.timeout_secs).dimmed(),
    );

    // Key status: file keys first, then <NAME>_API_KEY
    let file_keys = config.credentials();

    println!();
    println!("  {}", "Providers:".bold());
    for profile in PROVIDERS {
        let status = key_status(&file_keys, profile.name, &profile.env_key());
        println!("    {:<20} {}", profile.display_name, status);
    }

    println!();
    println!("  {}", "Capabilities:".bold());
    for capability in CAPABILITIES {
        let status = key_status(&file_keys, capability.credential, &capability.env_key());
        println!("    {:<20} {}", capability.name, status);
    }

    println!();

    Ok(())
}

fn key_status(file_keys: &dyn CredentialProvider, name: &str, env_key: &str) -> String {
    if file_keys.is_present(name) {
        format!("{} (config)", "✓".green())
    } else if std::env::var(env_key).is_ok_and(|v| !v.trim().is_empty()) {
        format!("{} ({env_key})", "✓".green())
    } else {
        format!("{} {}", "· not configured".dimmed(), format!("(set {env_key})").dimmed())
    }
}

//! `canvaschat init` — write a default configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use canvaschat_core::config::{load_config, save_config};
use canvaschat_providers::registry::PROVIDERS;

use crate::resolve_config_path;

/// Run the init command.
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = resolve_config_path(config_path);

    println!();
    println!("{}", "🎨 Canvaschat — Setup".cyan().bold());
    println!();

    if write_default_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    println!();
    println!("  Add API keys to the config file or export them:");
    for profile in PROVIDERS {
        println!("    {}", profile.env_key().dimmed());
    }
    println!();

    Ok(())
}

/// Write defaults (plus any env overrides) unless a file already exists.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let config = load_config(Some(path));
    save_config(&config, Some(path))
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    Ok(true)
}

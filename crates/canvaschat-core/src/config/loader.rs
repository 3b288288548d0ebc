//! Config loader — reads `~/.canvaschat/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.canvaschat/config.json`
//! 3. Environment variables `CANVASCHAT_<SECTION>__<FIELD>` (override JSON)
//!
//! Plain `<PROVIDER>_API_KEY` variables are not read here; the CLI layers
//! `EnvCredentials` under the file's keys at lookup time.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{CapabilityConfig, Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `CANVASCHAT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `CANVASCHAT_PROVIDERS__<NAME>__API_KEY` / `__API_BASE` / `__MODEL`
/// - `CANVASCHAT_CAPABILITIES__<SEARCH|SPEECH|IMAGE>__API_KEY`
/// - `CANVASCHAT_ORCHESTRATOR__PRIMARY`
/// - `CANVASCHAT_ORCHESTRATOR__FORMATTER`
/// - `CANVASCHAT_ORCHESTRATOR__FALLBACK_ORDER` (comma-separated)
/// - `CANVASCHAT_REQUEST__MAX_TOKENS` / `__TEMPERATURE` / `__TIMEOUT_SECS`
fn apply_env_overrides(mut config: Config) -> Config {
    apply_provider_env(&mut config.providers.anthropic, "ANTHROPIC");
    apply_provider_env(&mut config.providers.groq, "GROQ");
    apply_provider_env(&mut config.providers.deepseek, "DEEPSEEK");
    apply_provider_env(&mut config.providers.openai, "OPENAI");

    apply_capability_env(&mut config.capabilities.search, "SEARCH");
    apply_capability_env(&mut config.capabilities.speech, "SPEECH");
    apply_capability_env(&mut config.capabilities.image, "IMAGE");

    // Orchestrator
    if let Ok(val) = std::env::var("CANVASCHAT_ORCHESTRATOR__PRIMARY") {
        if !val.trim().is_empty() {
            config.orchestrator.primary = val.trim().to_lowercase();
        }
    }
    if let Ok(val) = std::env::var("CANVASCHAT_ORCHESTRATOR__FORMATTER") {
        config.orchestrator.formatter = Some(val.trim().to_lowercase()).filter(|v| !v.is_empty());
    }
    if let Ok(val) = std::env::var("CANVASCHAT_ORCHESTRATOR__FALLBACK_ORDER") {
        config.orchestrator.fallback_order = parse_list(&val);
    }

    // Request defaults
    if let Ok(val) = std::env::var("CANVASCHAT_REQUEST__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.request.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("CANVASCHAT_REQUEST__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.request.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("CANVASCHAT_REQUEST__TIMEOUT_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.request.timeout_secs = n;
        }
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("CANVASCHAT_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("CANVASCHAT_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if let Ok(val) = std::env::var(format!("CANVASCHAT_PROVIDERS__{name}__MODEL")) {
        provider.model = Some(val);
    }
}

fn apply_capability_env(capability: &mut CapabilityConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("CANVASCHAT_CAPABILITIES__{name}__API_KEY")) {
        capability.api_key = val;
    }
}

/// Split a comma-separated provider list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

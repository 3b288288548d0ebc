//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProvidersConfig`, `CapabilitiesConfig`,
//! `OrchestratorConfig`, `RequestDefaults`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

use crate::credentials::StaticCredentials;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.canvaschat/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub capabilities: CapabilitiesConfig,
    pub orchestrator: OrchestratorConfig,
    pub request: RequestDefaults,
}

impl Config {
    /// Every non-empty key in the file, addressed by credential name.
    pub fn credentials(&self) -> StaticCredentials {
        let mut creds = StaticCredentials::new();
        for (name, provider) in self.providers.entries() {
            if provider.is_configured() {
                creds.insert(name, provider.api_key.clone());
            }
        }
        for (name, capability) in self.capabilities.entries() {
            if !capability.api_key.is_empty() {
                creds.insert(name, capability.api_key.clone());
            }
        }
        creds
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model override (otherwise the provider's default model).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations, one per supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub groq: ProviderConfig,
    #[serde(default)]
    pub deepseek: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
}

impl ProvidersConfig {
    /// Get a provider config by name (e.g. `"anthropic"`).
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, config)| config)
    }

    /// `(name, config)` pairs in declaration order.
    pub fn entries(&self) -> [(&'static str, &ProviderConfig); 4] {
        [
            ("anthropic", &self.anthropic),
            ("groq", &self.groq),
            ("deepseek", &self.deepseek),
            ("openai", &self.openai),
        ]
    }
}

// ─────────────────────────────────────────────
// Auxiliary capabilities
// ─────────────────────────────────────────────

/// Key for one auxiliary capability.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Auxiliary capabilities that generated fragments may call.
///
/// Each one is backed by a single vendor whose credential name is fixed:
/// search → `brave`, speech → `elevenlabs`, image → `replicate`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub search: CapabilityConfig,
    #[serde(default)]
    pub speech: CapabilityConfig,
    #[serde(default)]
    pub image: CapabilityConfig,
}

impl CapabilitiesConfig {
    /// `(credential name, config)` pairs.
    pub fn entries(&self) -> [(&'static str, &CapabilityConfig); 3] {
        [
            ("brave", &self.search),
            ("elevenlabs", &self.speech),
            ("replicate", &self.image),
        ]
    }
}

// ─────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────

/// Provider priority. The primary is mandatory and always tried last.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Mandatory provider; also the final fallback.
    pub primary: String,
    /// Provider that repairs unstructured output (defaults to the primary).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    /// Optional providers, tried in this order before the primary.
    pub fallback_order: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            primary: "anthropic".to_string(),
            formatter: None,
            fallback_order: vec![
                "groq".to_string(),
                "deepseek".to_string(),
                "openai".to_string(),
            ],
        }
    }
}

// ─────────────────────────────────────────────
// Request defaults
// ─────────────────────────────────────────────

/// Parameters shared by every provider call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDefaults {
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// HTTP timeout per provider call, in seconds.
    pub timeout_secs: u64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

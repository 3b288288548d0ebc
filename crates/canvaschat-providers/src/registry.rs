//! Provider registry — static profiles for every supported LLM provider.
//!
//! Each `ProviderProfile` describes how to reach a provider and what part it
//! plays in the fallback chain. Adding a provider means adding one entry here
//! (and an adapter if its API family is new), not new branches in the sequencer.

use canvaschat_core::credentials::env_key_for;

// ─────────────────────────────────────────────
// ProviderProfile — static metadata for one provider
// ─────────────────────────────────────────────

/// Request/response shape a provider speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderFamily {
    /// `POST {base}/chat/completions`, bearer auth.
    OpenAiCompatible,
    /// `POST {base}/messages`, `x-api-key` auth, tool-forced output.
    Anthropic,
}

/// Where a provider sits in the fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderRole {
    /// Mandatory; tried last and used as the formatter by default.
    Primary,
    /// Cheap and quick, tried first when configured.
    FastFallback,
    /// Alternate reasoning model.
    ReasoningFallback,
    /// Only ever used to repair another provider's output.
    FormatterOnly,
}

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderProfile {
    /// Internal name, also the credential name (e.g. `"groq"`).
    pub name: &'static str,
    /// Human-readable name for logs. E.g. `"Groq"`.
    pub display_name: &'static str,
    pub family: ProviderFamily,
    pub role: ProviderRole,
    /// Default API base URL (no trailing slash).
    pub default_api_base: &'static str,
    /// Model used when the config doesn't name one.
    pub default_model: &'static str,
    /// Whether calls constrain output to the envelope schema directly.
    pub structured_output: bool,
    /// Whether free-text calls may send `response_format: json_object`.
    pub json_mode: bool,
}

impl ProviderProfile {
    /// External credential key, e.g. `"GROQ_API_KEY"`.
    pub fn env_key(&self) -> String {
        env_key_for(self.name)
    }
}

// ─────────────────────────────────────────────
// Built-in providers
// ─────────────────────────────────────────────

/// Complete list of supported providers.
pub static PROVIDERS: &[ProviderProfile] = &[
    // Primary reasoning — forced structure via tool use
    ProviderProfile {
        name: "anthropic",
        display_name: "Anthropic",
        family: ProviderFamily::Anthropic,
        role: ProviderRole::Primary,
        default_api_base: "https://api.anthropic.com/v1",
        default_model: "claude-sonnet-4-20250514",
        structured_output: true,
        json_mode: false,
    },
    // Fast inference
    ProviderProfile {
        name: "groq",
        display_name: "Groq",
        family: ProviderFamily::OpenAiCompatible,
        role: ProviderRole::FastFallback,
        default_api_base: "https://api.groq.com/openai/v1",
        default_model: "llama-3.3-70b-versatile",
        structured_output: false,
        json_mode: true,
    },
    // Secondary reasoning
    ProviderProfile {
        name: "deepseek",
        display_name: "DeepSeek",
        family: ProviderFamily::OpenAiCompatible,
        role: ProviderRole::ReasoningFallback,
        default_api_base: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
        structured_output: false,
        json_mode: true,
    },
    ProviderProfile {
        name: "openai",
        display_name: "OpenAI",
        family: ProviderFamily::OpenAiCompatible,
        role: ProviderRole::ReasoningFallback,
        default_api_base: "https://api.openai.com/v1",
        default_model: "gpt-4o",
        structured_output: false,
        json_mode: true,
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a provider profile by exact name (case-insensitive).
pub fn find_by_name(name: &str) -> Option<&'static ProviderProfile> {
    PROVIDERS
        .iter()
        .find(|profile| profile.name.eq_ignore_ascii_case(name))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

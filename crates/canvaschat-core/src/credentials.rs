//! Credential lookup.
//!
//! A provider or auxiliary capability is usable iff its credential is present.
//! Lookups go through [`CredentialProvider`] so the orchestrator never touches
//! a global namespace directly and tests can inject fakes.
//!
//! Credentials are addressed by vendor name (`"anthropic"`, `"groq"`, `"brave"`).
//! The external key for a name is `<NAME>_API_KEY`, see [`env_key_for`].

use std::collections::HashMap;

/// Source of per-provider secrets.
///
/// Implementations must not cache across calls: the orchestrator reads keys
/// at call time so a key added between two messages takes effect immediately.
pub trait CredentialProvider: Send + Sync {
    /// The secret for `name`, or `None` when absent. Blank values count as absent.
    fn get(&self, name: &str) -> Option<String>;

    /// Whether a credential for `name` is configured.
    fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// External key name for a credential: `groq` → `GROQ_API_KEY`.
pub fn env_key_for(name: &str) -> String {
    format!("{}_API_KEY", name.to_uppercase().replace('-', "_"))
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// ─────────────────────────────────────────────
// Environment
// ─────────────────────────────────────────────

/// Reads `<NAME>_API_KEY` from the process environment on every lookup.
#[derive(Clone, Debug, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(env_key_for(name)).ok().and_then(non_blank)
    }
}

// ─────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────

/// Fixed in-memory credentials (config file values, tests).
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential (builder pattern). Names are case-insensitive.
    pub fn with(mut self, name: &str, secret: impl Into<String>) -> Self {
        self.insert(name, secret);
        self
    }

    pub fn insert(&mut self, name: &str, secret: impl Into<String>) {
        self.keys.insert(name.to_lowercase(), secret.into());
    }
}

impl CredentialProvider for StaticCredentials {
    fn get(&self, name: &str) -> Option<String> {
        self.keys
            .get(&name.to_lowercase())
            .cloned()
            .and_then(non_blank)
    }
}

// ─────────────────────────────────────────────
// Layered
// ─────────────────────────────────────────────

/// Tries each layer in order; the first one holding a value wins.
#[derive(Default)]
pub struct LayeredCredentials {
    layers: Vec<Box<dyn CredentialProvider>>,
}

impl LayeredCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer.
    pub fn layer(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.layers.push(Box::new(provider));
        self
    }
}

impl CredentialProvider for LayeredCredentials {
    fn get(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(name))
    }
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for std::sync::Arc<T> {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! LLM provider layer for Canvaschat.
//!
//! # Architecture
//!
//! - [`traits::ProviderAdapter`] — `(system, history, message) -> raw text | envelope`
//! - [`registry`] — static [`ProviderProfile`]s: endpoint family, structured-output
//!   support, and role in the fallback chain
//! - [`http_provider::OpenAiCompatibleAdapter`] — free-text chat completions (Groq, DeepSeek, OpenAI)
//! - [`anthropic::AnthropicAdapter`] — Messages API with a forced `respond` tool
//! - [`http_provider::create_adapter`] — picks the adapter for a profile

pub mod anthropic;
pub mod http_provider;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use anthropic::AnthropicAdapter;
pub use http_provider::{create_adapter, OpenAiCompatibleAdapter};
pub use registry::{ProviderFamily, ProviderProfile, ProviderRole, PROVIDERS};
pub use traits::{AdapterError, AdapterOutput, AdapterSettings, ProviderAdapter, ProviderRequest};

//! Provider adapter trait — the common contract every LLM backend implements.
//!
//! An adapter wraps exactly one network call. It never retries and never
//! lets an error escape as a panic: every outcome is a tagged `Result`.

use std::time::Duration;

use async_trait::async_trait;
use canvaschat_core::config::schema::{ProviderConfig, RequestDefaults};
use canvaschat_core::types::{ConversationTurn, ResponseEnvelope, Role, WireMessage};
use thiserror::Error;

use crate::registry::ProviderProfile;

/// One provider call: instruction text, prior turns, and the new message.
#[derive(Clone, Copy, Debug)]
pub struct ProviderRequest<'a> {
    /// System instruction (composed capability prompt, or formatter prompt).
    pub system: &'a str,
    /// Prior turns, oldest first. May be empty.
    pub history: &'a [ConversationTurn],
    /// The user message to answer. Non-empty.
    pub message: &'a str,
}

impl<'a> ProviderRequest<'a> {
    pub fn new(system: &'a str, history: &'a [ConversationTurn], message: &'a str) -> Self {
        Self {
            system,
            history,
            message,
        }
    }

    /// History followed by the user message, without the system instruction.
    ///
    /// Callers that snapshot history after pushing the new user turn would
    /// send it twice; if the last turn already is that exact user message it
    /// is not appended again.
    pub fn conversation(&self) -> Vec<WireMessage> {
        let mut messages: Vec<WireMessage> =
            self.history.iter().map(WireMessage::from_turn).collect();

        let already_last = self
            .history
            .last()
            .is_some_and(|turn| turn.role == Role::User && turn.content == self.message);
        if !already_last {
            messages.push(WireMessage::from_turn(&ConversationTurn::user(self.message)));
        }
        messages
    }
}

/// What a successful call produced.
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterOutput {
    /// Forced-structure mode: already a valid envelope.
    Structured(ResponseEnvelope),
    /// Free-text mode: must go through the envelope validator.
    Text(String),
}

/// Why a call failed. Recovered by the sequencer, never shown to users.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AdapterError {
    /// Transport failure: DNS, connect, TLS, timeout.
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    /// Non-success HTTP status, including authentication rejection.
    #[error("provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
    /// The provider answered but the body was not what we asked for.
    #[error("malformed provider response: {0}")]
    MalformedBody(String),
}

impl AdapterError {
    /// Whether the provider refused our credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, AdapterError::Rejected { status: 401 | 403, .. })
    }
}

/// Per-adapter connection and sampling settings.
#[derive(Clone, Debug)]
pub struct AdapterSettings {
    /// Overrides the profile's default API base.
    pub api_base: Option<String>,
    /// Overrides the profile's default model.
    pub model: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// HTTP timeout for the whole call.
    pub timeout: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            api_base: None,
            model: None,
            max_tokens: 8192,
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}

impl AdapterSettings {
    /// Settings from one provider's config entry plus the shared request defaults.
    pub fn from_config(provider: &ProviderConfig, request: &RequestDefaults) -> Self {
        Self {
            api_base: provider.api_base.clone().filter(|b| !b.is_empty()),
            model: provider.model.clone().filter(|m| !m.is_empty()),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            timeout: Duration::from_secs(request.timeout_secs),
        }
    }
}

/// Trait that all provider adapters implement.
///
/// The credential is passed per call rather than stored, so keys are read
/// at orchestration time and an adapter can be reused across key changes.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Perform one request.
    ///
    /// # Returns
    /// `Structured` for forced-structure providers, `Text` otherwise.
    /// Every failure is an `AdapterError`; nothing is retried here.
    async fn call(
        &self,
        credential: &str,
        request: &ProviderRequest<'_>,
    ) -> Result<AdapterOutput, AdapterError>;

    /// Static profile of the provider this adapter talks to.
    fn profile(&self) -> &'static ProviderProfile;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str {
        self.profile().display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_appends_message() {
        let history = vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello"),
        ];
        let request = ProviderRequest::new("sys", &history, "build a calculator");
        let messages = request.conversation();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].content, "build a calculator");
    }

    #[test]
    fn test_conversation_empty_history() {
        let request = ProviderRequest::new("sys", &[], "hello");
        let messages = request.conversation();
        assert_eq!(messages, vec![WireMessage {
            role: "user".to_string(),
            content: "hello".to_string()
        }]);
    }

    #[test]
    fn test_conversation_does_not_duplicate_trailing_user_turn() {
        let history = vec![
            ConversationTurn::assistant("earlier"),
            ConversationTurn::user("same message"),
        ];
        let request = ProviderRequest::new("sys", &history, "same message");
        assert_eq!(request.conversation().len(), 2);
    }

    #[test]
    fn test_conversation_repeats_message_after_assistant_turn() {
        let history = vec![
            ConversationTurn::user("again"),
            ConversationTurn::assistant("ok"),
        ];
        let request = ProviderRequest::new("sys", &history, "again");
        assert_eq!(request.conversation().len(), 3);
    }

    #[test]
    fn test_adapter_error_is_auth() {
        assert!(AdapterError::Rejected { status: 401, body: String::new() }.is_auth());
        assert!(!AdapterError::Rejected { status: 429, body: String::new() }.is_auth());
        assert!(!AdapterError::Unreachable("x".into()).is_auth());
    }

    #[test]
    fn test_settings_from_config() {
        let provider = ProviderConfig {
            api_key: "k".to_string(),
            api_base: Some(String::new()),
            model: Some("deepseek-reasoner".to_string()),
        };
        let request = RequestDefaults {
            max_tokens: 1000,
            temperature: 0.2,
            timeout_secs: 5,
        };
        let settings = AdapterSettings::from_config(&provider, &request);
        assert!(settings.api_base.is_none());
        assert_eq!(settings.model.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(settings.max_tokens, 1000);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }
}

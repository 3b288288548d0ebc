//! HTTP adapter for OpenAI-compatible chat completion APIs.
//!
//! Covers the free-text providers: Groq, DeepSeek, OpenAI. The system
//! instruction describes the envelope format; the reply is returned as raw
//! text for the envelope validator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use canvaschat_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, ResponseFormat, WireMessage,
};

use crate::anthropic::AnthropicAdapter;
use crate::registry::{ProviderFamily, ProviderProfile};
use crate::traits::{AdapterError, AdapterOutput, AdapterSettings, ProviderAdapter, ProviderRequest};

// ─────────────────────────────────────────────
// Shared HTTP plumbing
// ─────────────────────────────────────────────

/// Build a client with the given timeout, falling back to reqwest defaults.
pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
            reqwest::Client::new()
        })
}

/// Send a prepared request and decode a JSON body, mapping every failure
/// onto `AdapterError`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<T, AdapterError> {
    let response = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!(provider, error = %e, "HTTP request failed");
            return Err(AdapterError::Unreachable(e.to_string()));
        }
    };

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(provider, status = %status, body = %error_text, "API error");
        return Err(AdapterError::Rejected {
            status: status.as_u16(),
            body: error_text,
        });
    }

    response.json::<T>().await.map_err(|e| {
        error!(provider, error = %e, "Failed to parse provider response");
        AdapterError::MalformedBody(e.to_string())
    })
}

// ─────────────────────────────────────────────
// OpenAiCompatibleAdapter
// ─────────────────────────────────────────────

/// Free-text adapter for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatibleAdapter {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.groq.com/openai/v1"`).
    api_base: String,
    /// Model sent with each request.
    model: String,
    max_tokens: u32,
    temperature: f64,
    profile: &'static ProviderProfile,
}

impl std::fmt::Debug for OpenAiCompatibleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleAdapter")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("provider", &self.profile.display_name)
            .finish()
    }
}

impl OpenAiCompatibleAdapter {
    pub fn new(profile: &'static ProviderProfile, settings: &AdapterSettings) -> Self {
        let api_base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| profile.default_api_base.to_string());
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| profile.default_model.to_string());

        Self {
            client: build_client(settings.timeout),
            api_base,
            model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            profile,
        }
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_body(&self, request: &ProviderRequest<'_>) -> ChatCompletionRequest {
        let mut messages = vec![WireMessage::system(request.system)];
        messages.extend(request.conversation());

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_p: 1.0,
            stream: false,
            response_format: self.profile.json_mode.then(ResponseFormat::json_object),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    async fn call(
        &self,
        credential: &str,
        request: &ProviderRequest<'_>,
    ) -> Result<AdapterOutput, AdapterError> {
        let body = self.build_body(request);

        debug!(
            provider = self.profile.display_name,
            model = %self.model,
            messages = body.messages.len(),
            json_mode = body.response_format.is_some(),
            "Calling provider"
        );

        let http_request = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential)
            .json(&body);

        let response: ChatCompletionResponse =
            send_json(http_request, self.profile.display_name).await?;

        let content = response
            .first_content()
            .ok_or_else(|| AdapterError::MalformedBody("no content in response".to_string()))?;

        debug!(
            provider = self.profile.display_name,
            chars = content.len(),
            "Provider response received"
        );

        Ok(AdapterOutput::Text(content))
    }

    fn profile(&self) -> &'static ProviderProfile {
        self.profile
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build the adapter matching a profile's API family.
pub fn create_adapter(
    profile: &'static ProviderProfile,
    settings: &AdapterSettings,
) -> Arc<dyn ProviderAdapter> {
    debug!(
        provider = profile.display_name,
        api_base = settings.api_base.as_deref().unwrap_or("default"),
        "Creating provider adapter"
    );

    match profile.family {
        ProviderFamily::OpenAiCompatible => {
            Arc::new(OpenAiCompatibleAdapter::new(profile, settings))
        }
        ProviderFamily::Anthropic => Arc::new(AnthropicAdapter::new(profile, settings)),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

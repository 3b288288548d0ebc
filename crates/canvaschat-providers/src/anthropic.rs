//! Anthropic Messages API adapter — forced-structure mode.
//!
//! The request declares a single `respond` tool whose input schema is the
//! response envelope and forces the model to call it. The tool input is
//! decoded straight into a `ResponseEnvelope`, so a successful call never
//! needs free-text parsing.

use async_trait::async_trait;
use tracing::debug;

use canvaschat_core::types::{
    AnthropicRequest, AnthropicResponse, AnthropicTool, AnthropicToolChoice, ResponseEnvelope,
};
use canvaschat_core::utils::truncate_string;

use crate::http_provider::{build_client, send_json};
use crate::registry::ProviderProfile;
use crate::traits::{AdapterError, AdapterOutput, AdapterSettings, ProviderAdapter, ProviderRequest};

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Name of the tool that carries the envelope.
pub const RESPOND_TOOL: &str = "respond";

/// Structured-output adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    profile: &'static ProviderProfile,
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicAdapter {
    pub fn new(profile: &'static ProviderProfile, settings: &AdapterSettings) -> Self {
        Self {
            client: build_client(settings.timeout),
            api_base: settings
                .api_base
                .clone()
                .unwrap_or_else(|| profile.default_api_base.to_string()),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| profile.default_model.to_string()),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            profile,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.api_base.trim_end_matches('/'))
    }

    fn build_body(&self, request: &ProviderRequest<'_>) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            system: request.system.to_string(),
            messages: request.conversation(),
            tools: vec![respond_tool()],
            tool_choice: Some(AnthropicToolChoice::tool(RESPOND_TOOL)),
        }
    }
}

/// The tool declaration that constrains output to the envelope.
fn respond_tool() -> AnthropicTool {
    AnthropicTool {
        name: RESPOND_TOOL.to_string(),
        description: "Deliver the reply to the user as a text answer or an interactive HTML fragment."
            .to_string(),
        input_schema: ResponseEnvelope::json_schema(),
    }
}

/// Longest slice of stray text quoted in an error.
const MAX_STRAY_TEXT_CHARS: usize = 80;

/// Pull the envelope out of the forced tool call.
fn extract_envelope(response: &AnthropicResponse) -> Result<ResponseEnvelope, AdapterError> {
    let input = response.tool_input(RESPOND_TOOL).ok_or_else(|| {
        AdapterError::MalformedBody(format!(
            "no {RESPOND_TOOL} tool call (stop_reason: {}, text: {:?})",
            response.stop_reason.as_deref().unwrap_or("?"),
            truncate_string(&response.text(), MAX_STRAY_TEXT_CHARS)
        ))
    })?;

    let envelope: ResponseEnvelope = serde_json::from_value(input.clone())
        .map_err(|e| AdapterError::MalformedBody(format!("tool input is not an envelope: {e}")))?;
    if envelope.response.trim().is_empty() {
        return Err(AdapterError::MalformedBody(
            "tool input has an empty response".to_string(),
        ));
    }
    Ok(envelope)
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
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
            "Calling provider with forced structure"
        );

        let http_request = self
            .client
            .post(self.messages_url())
            .header("x-api-key", credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: AnthropicResponse =
            send_json(http_request, self.profile.display_name).await?;
        let envelope = extract_envelope(&response)?;

        debug!(
            provider = self.profile.display_name,
            responsetype = envelope.responsetype.as_str(),
            chars = envelope.response.len(),
            "Structured response received"
        );

        Ok(AdapterOutput::Structured(envelope))
    }

    fn profile(&self) -> &'static ProviderProfile {
        self.profile
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

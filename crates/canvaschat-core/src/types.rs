//! Core types for Canvaschat.
//!
//! Two groups live here:
//! - the caller-facing contract: [`ConversationTurn`] in, [`ResponseEnvelope`] out;
//! - the wire formats of the two provider families we talk to
//!   (OpenAI-compatible chat completions and the Anthropic Messages API).

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One prior message in the conversation, as supplied by the caller.
///
/// History is a snapshot: the orchestrator reads it and never mutates it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Response envelope
// ─────────────────────────────────────────────

/// How the caller should present [`ResponseEnvelope::response`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Html,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Text => "text",
            ResponseType::Html => "html",
        }
    }
}

/// The only shape every orchestration path returns.
///
/// Field names match the JSON the models are asked to produce, so the same
/// type is used to parse provider output and to hand results back.
/// `response` is passed through verbatim; HTML fragments are not sanitized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub responsetype: ResponseType,
    pub response: String,
}

impl ResponseEnvelope {
    /// A plain-text envelope.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            responsetype: ResponseType::Text,
            response: response.into(),
        }
    }

    /// An HTML-fragment envelope.
    pub fn html(response: impl Into<String>) -> Self {
        Self {
            responsetype: ResponseType::Html,
            response: response.into(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.responsetype == ResponseType::Html
    }

    /// JSON schema of the envelope, used to force structured output.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "responsetype": {
                    "type": "string",
                    "enum": ["text", "html"],
                    "description": "\"html\" for an interactive fragment, \"text\" otherwise"
                },
                "response": {
                    "type": "string",
                    "description": "The plain-text answer or the self-contained HTML fragment"
                }
            },
            "required": ["responsetype", "response"]
        })
    }
}

// ─────────────────────────────────────────────
// OpenAI-compatible chat completions
// ─────────────────────────────────────────────

/// A message in an OpenAI-compatible request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn from_turn(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// `response_format` hint for providers that support JSON mode.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub top_p: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Raw chat completion response. Only the first choice's text is read;
/// everything else (ids, usage, finish reasons) is ignored.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any and non-blank.
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
    }
}

// ─────────────────────────────────────────────
// Anthropic Messages API
// ─────────────────────────────────────────────

/// Request body for `POST /v1/messages`.
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub system: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<AnthropicTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<AnthropicToolChoice>,
}

/// A tool declaration. Used here only to force the envelope shape.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// `tool_choice` forcing one named tool.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AnthropicToolChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
    pub name: String,
}

impl AnthropicToolChoice {
    pub fn tool(name: impl Into<String>) -> Self {
        Self {
            choice_type: "tool".to_string(),
            name: name.into(),
        }
    }
}

/// Response body of `POST /v1/messages`.
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    pub stop_reason: Option<String>,
}

/// One content block in an Anthropic response.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

impl AnthropicResponse {
    /// Input of the first `tool_use` block calling `tool_name`.
    pub fn tool_input(&self, tool_name: &str) -> Option<&serde_json::Value> {
        self.content.iter().find_map(|block| match block {
            AnthropicContentBlock::ToolUse { name, input, .. } if name == tool_name => Some(input),
            _ => None,
        })
    }

    /// All text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

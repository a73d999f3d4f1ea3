//! Canonical request and response types
//!
//! The canonical format is the Messages shape every inbound request arrives in
//! and every mapped provider response is converted back to. Only the fields a
//! basic chat completion needs are modelled; unknown top-level request fields
//! are kept in `extra` so pass-through providers see them unchanged.

use crate::providers::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

impl MessageRole {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Content of a message: a bare string or a list of typed blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Typed content blocks
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flatten to plain text. Text blocks are concatenated in order and every
    /// other block type contributes the empty string.
    pub fn flatten_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => text.as_str(),
                    ContentBlock::Unsupported => "",
                })
                .collect(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

/// A typed content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text block
    Text { text: String },
    /// Any block type the relay does not translate (images, tool use, ...)
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Inbound chat request in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    /// Canonical model identifier requested by the client
    pub model: String,

    /// Ordered conversation, must not be empty
    pub messages: Vec<Message>,

    /// Optional system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<MessageContent>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Whether the client asked for a streamed response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Fields the relay does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalRequest {
    /// Create a request for `model` with the given messages
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: None,
            temperature: None,
            stream: None,
            extra: Map::new(),
        }
    }

    /// Set the maximum output tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<MessageContent>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Parse and validate a canonical request from a JSON value
    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        let request: CanonicalRequest =
            serde_json::from_value(value).map_err(|e| RelayError::BadRequest {
                message: format!("invalid request body: {}", e),
            })?;
        request.validate()?;
        Ok(request)
    }

    /// Check the request invariants
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.model.trim().is_empty() {
            return Err(RelayError::BadRequest {
                message: "model must not be empty".to_string(),
            });
        }
        if self.messages.is_empty() {
            return Err(RelayError::BadRequest {
                message: "messages must not be empty".to_string(),
            });
        }
        if self.max_tokens == Some(0) {
            return Err(RelayError::BadRequest {
                message: "max_tokens must be a positive integer".to_string(),
            });
        }
        Ok(())
    }

    /// Whether the client asked for streaming
    pub fn is_streaming(&self) -> bool {
        self.stream == Some(true)
    }

    /// System prompt flattened to text, if any
    pub fn system_text(&self) -> Option<String> {
        self.system
            .as_ref()
            .map(MessageContent::flatten_text)
            .filter(|text| !text.is_empty())
    }
}

/// Object type tag of a canonical response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Message,
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the turn
    EndTurn,
    /// Output was cut off (also used for any unrecognised finish code)
    MaxTokens,
}

impl StopReason {
    /// Map a provider finish code. Only `STOP`/`stop` count as a natural end.
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("STOP") | Some("stop") => StopReason::EndTurn,
            _ => StopReason::MaxTokens,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Response returned to the client in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResponse {
    /// Provider id when supplied, otherwise `msg_<uuid>`
    pub id: String,

    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Always assistant
    pub role: MessageRole,

    /// Ordered content blocks; only text is populated
    pub content: Vec<ContentBlock>,

    /// Echo of the canonical model the client requested
    pub model: String,

    pub stop_reason: StopReason,

    /// Always null
    pub stop_sequence: Option<String>,

    pub usage: Usage,
}

impl CanonicalResponse {
    /// Build a single-text-block assistant response
    pub fn text(
        id: impl Into<String>,
        model: impl Into<String>,
        text: impl Into<String>,
        stop_reason: StopReason,
        usage: Usage,
    ) -> Self {
        Self {
            id: id.into(),
            response_type: ResponseType::Message,
            role: MessageRole::Assistant,
            content: vec![ContentBlock::text(text)],
            model: model.into(),
            stop_reason,
            stop_sequence: None,
            usage,
        }
    }

    /// Generate a response id for providers that do not supply one
    pub fn generate_id() -> String {
        format!("msg_{}", Uuid::new_v4().simple())
    }

    /// Concatenated text of all text blocks
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Unsupported => None,
            })
            .collect()
    }
}

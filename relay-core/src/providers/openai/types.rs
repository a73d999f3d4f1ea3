//! OpenAI chat completion wire types
//!
//! Only the subset needed for a basic chat completion is modelled. The
//! response types are also used for DashScope's compatible-mode payloads.

use serde::{Deserialize, Serialize};

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Only written when the client asked for streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Flattened chat message
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiMessage {
    pub role: &'static str,
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub choices: Option<Vec<OpenAiChoice>>,

    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    #[serde(default)]
    pub message: Option<OpenAiChoiceMessage>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: u64,

    #[serde(default)]
    pub completion_tokens: u64,
}

impl OpenAiChoice {
    /// Text of the choice, empty when the message carries none
    pub fn text(&self) -> String {
        self.message
            .as_ref()
            .and_then(|m| m.content.clone())
            .unwrap_or_default()
    }
}

//! Conversion between the canonical format and OpenAI chat completions

use super::types::{OpenAiMessage, OpenAiRequest, OpenAiResponse};
use crate::protocol::types::{CanonicalRequest, CanonicalResponse, StopReason, Usage};
use crate::providers::error::RelayError;

/// Flatten canonical messages into OpenAI messages, system prompt first
pub fn to_openai_messages(request: &CanonicalRequest) -> Vec<OpenAiMessage> {
    let system = request.system_text().map(|content| OpenAiMessage {
        role: "system",
        content,
    });

    system
        .into_iter()
        .chain(request.messages.iter().map(|message| OpenAiMessage {
            role: message.role.as_str(),
            content: message.content.flatten_text(),
        }))
        .collect()
}

/// Build an OpenAI request for an already resolved native model
pub fn to_openai_request(
    request: &CanonicalRequest,
    native_model: String,
    max_tokens: Option<u32>,
) -> OpenAiRequest {
    OpenAiRequest {
        model: native_model,
        messages: to_openai_messages(request),
        max_tokens,
        temperature: request.temperature,
        stream: request.is_streaming().then_some(true),
    }
}

/// Convert an OpenAI-shaped response. `provider` labels errors.
pub fn from_openai_response(
    response: OpenAiResponse,
    provider: &str,
    requested_model: &str,
) -> Result<CanonicalResponse, RelayError> {
    let choice = response
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| RelayError::EmptyCandidates {
            provider: provider.to_string(),
        })?;

    let usage = response
        .usage
        .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(CanonicalResponse::text(
        response.id.unwrap_or_else(CanonicalResponse::generate_id),
        requested_model,
        choice.text(),
        StopReason::from_finish_reason(choice.finish_reason.as_deref()),
        usage,
    ))
}

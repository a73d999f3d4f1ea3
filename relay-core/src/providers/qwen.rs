//! Qwen mapper for the DashScope native text-generation API
//!
//! Requests use DashScope's `input`/`parameters` envelope. Responses are
//! accepted in the native `output.text` form, in the `output.choices` form
//! returned when `result_format=message`, and in the OpenAI compatible-mode
//! form with top-level `choices`.

use crate::protocol::types::{CanonicalRequest, CanonicalResponse, StopReason, Usage};
use crate::providers::adapter::{ProviderKind, SchemaMapper};
use crate::providers::error::RelayError;
use crate::providers::models;
use crate::providers::openai::converter::to_openai_messages;
use crate::providers::openai::types::{OpenAiChoice, OpenAiMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// DashScope rejects larger generation budgets
pub const QWEN_MAX_OUTPUT_TOKENS: u32 = 8192;

pub static QWEN: QwenMapper = QwenMapper;

#[derive(Debug, Serialize)]
pub struct QwenRequest {
    pub model: String,
    pub input: QwenInput,
    pub parameters: QwenParameters,
}

#[derive(Debug, Serialize)]
pub struct QwenInput {
    pub messages: Vec<OpenAiMessage>,
}

#[derive(Debug, Default, Serialize)]
pub struct QwenParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct QwenResponse {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    output: Option<QwenOutput>,
    #[serde(default)]
    choices: Option<Vec<OpenAiChoice>>,
    #[serde(default)]
    usage: Option<QwenUsage>,
}

#[derive(Debug, Deserialize)]
struct QwenOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    choices: Option<Vec<OpenAiChoice>>,
}

// Native usage uses input/output names, compatible mode the OpenAI ones.
#[derive(Debug, Default, Deserialize)]
struct QwenUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

impl QwenUsage {
    fn into_usage(self) -> Usage {
        Usage::new(
            self.input_tokens.or(self.prompt_tokens).unwrap_or(0),
            self.output_tokens.or(self.completion_tokens).unwrap_or(0),
        )
    }
}

#[derive(Debug, Default)]
pub struct QwenMapper;

impl QwenMapper {
    /// Pick the first candidate text and finish code from whichever shape the
    /// response uses
    fn first_candidate(response: &QwenResponse) -> Option<(String, Option<String>)> {
        let from_choices = |choices: &Option<Vec<OpenAiChoice>>| {
            choices
                .as_ref()
                .and_then(|c| c.first())
                .map(|choice| (choice.text(), choice.finish_reason.clone()))
        };

        if let Some(output) = &response.output {
            if let Some(candidate) = from_choices(&output.choices) {
                return Some(candidate);
            }
            if let Some(text) = &output.text {
                return Some((text.clone(), output.finish_reason.clone()));
            }
        }
        from_choices(&response.choices)
    }
}

impl SchemaMapper for QwenMapper {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Qwen
    }

    fn max_output_tokens(&self) -> Option<u32> {
        Some(QWEN_MAX_OUTPUT_TOKENS)
    }

    fn to_provider_request(&self, request: &CanonicalRequest) -> Result<Value, RelayError> {
        let body = QwenRequest {
            model: models::resolve(ProviderKind::Qwen, &request.model),
            input: QwenInput {
                messages: to_openai_messages(request),
            },
            parameters: QwenParameters {
                max_tokens: self.clamp_max_tokens(request.max_tokens),
                temperature: request.temperature,
            },
        };
        serde_json::to_value(body).map_err(|e| RelayError::BadRequest {
            message: format!("failed to encode qwen request: {}", e),
        })
    }

    fn to_canonical_response(
        &self,
        body: Value,
        requested_model: &str,
    ) -> Result<CanonicalResponse, RelayError> {
        let response: QwenResponse =
            serde_json::from_value(body).map_err(|e| RelayError::MalformedResponse {
                provider: self.provider().to_string(),
                message: e.to_string(),
            })?;

        let (text, finish_reason) =
            Self::first_candidate(&response).ok_or_else(|| RelayError::EmptyCandidates {
                provider: self.provider().to_string(),
            })?;

        let id = response
            .request_id
            .or(response.id)
            .unwrap_or_else(CanonicalResponse::generate_id);
        let usage = response.usage.map(QwenUsage::into_usage).unwrap_or_default();

        Ok(CanonicalResponse::text(
            id,
            requested_model,
            text,
            StopReason::from_finish_reason(finish_reason.as_deref()),
            usage,
        ))
    }
}

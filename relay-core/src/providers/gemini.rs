//! Gemini `generateContent` mapper
//!
//! Gemini names the assistant role `model`, nests text under `parts` and puts
//! sampling settings in `generationConfig`. The model id is not part of the
//! body; it is substituted into the endpoint URL by the registry.

use crate::protocol::types::{
    CanonicalRequest, CanonicalResponse, MessageRole, StopReason, Usage,
};
use crate::providers::adapter::{ProviderKind, SchemaMapper};
use crate::providers::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared mapper instance
pub static GEMINI: GeminiMapper = GeminiMapper;

/// Gemini request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiInstruction>,

    /// Always present, possibly empty
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub role: &'static str,
    pub parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
pub struct GeminiInstruction {
    pub parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
pub struct GeminiTextPart {
    pub text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Gemini response body (only the fields the relay reads)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

/// Maps canonical requests to Gemini and back
#[derive(Debug, Default)]
pub struct GeminiMapper;

impl GeminiMapper {
    fn role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        }
    }

    /// Build the typed Gemini request
    pub fn build_request(&self, request: &CanonicalRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|message| GeminiContent {
                role: Self::role(message.role),
                parts: vec![GeminiTextPart {
                    text: message.content.flatten_text(),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: request.system_text().map(|text| GeminiInstruction {
                parts: vec![GeminiTextPart { text }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: self.clamp_max_tokens(request.max_tokens),
                temperature: request.temperature,
            },
        }
    }
}

impl SchemaMapper for GeminiMapper {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn to_provider_request(&self, request: &CanonicalRequest) -> Result<Value, RelayError> {
        serde_json::to_value(self.build_request(request)).map_err(|e| RelayError::BadRequest {
            message: format!("failed to encode gemini request: {}", e),
        })
    }

    fn to_canonical_response(
        &self,
        body: Value,
        requested_model: &str,
    ) -> Result<CanonicalResponse, RelayError> {
        let response: GeminiResponse =
            serde_json::from_value(body).map_err(|e| RelayError::MalformedResponse {
                provider: self.provider().to_string(),
                message: e.to_string(),
            })?;

        let candidate = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::EmptyCandidates {
                provider: self.provider().to_string(),
            })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        let usage = response
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(CanonicalResponse::text(
            response
                .response_id
                .unwrap_or_else(CanonicalResponse::generate_id),
            requested_model,
            text,
            StopReason::from_finish_reason(candidate.finish_reason.as_deref()),
            usage,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::Message;
    use serde_json::json;

    #[test]
    fn test_assistant_role_becomes_model() {
        let request = CanonicalRequest::new(
            "claude-3-haiku",
            vec![Message::user("hi"), Message::assistant("hello"), Message::user("again")],
        );
        let body = GEMINI.to_provider_request(&request).unwrap();

        let roles: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(body["generationConfig"], json!({}));
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_system_prompt_becomes_instruction() {
        let request = CanonicalRequest::new("m", vec![Message::user("hi")])
            .with_system("be brief")
            .with_temperature(0.2);
        let body = GEMINI.to_provider_request(&request).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
    }

    #[test]
    fn test_multiple_parts_are_joined() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "hel"}, {"text": "lo"}]},
                "finishReason": "MAX_TOKENS"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 7},
            "responseId": "resp-1"
        });
        let response = GEMINI.to_canonical_response(body, "claude-3-haiku").unwrap();

        assert_eq!(response.text_content(), "hello");
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.usage, Usage::new(3, 7));
        assert_eq!(response.id, "resp-1");
        assert_eq!(response.model, "claude-3-haiku");
    }

    #[test]
    fn test_empty_candidates_is_an_error() {
        let err = GEMINI
            .to_canonical_response(json!({"candidates": []}), "m")
            .unwrap_err();
        assert!(matches!(err, RelayError::EmptyCandidates { .. }));

        let err = GEMINI.to_canonical_response(json!({}), "m").unwrap_err();
        assert!(matches!(err, RelayError::EmptyCandidates { .. }));
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let err = GEMINI.to_canonical_response(json!([1, 2]), "m").unwrap_err();
        assert!(matches!(err, RelayError::MalformedResponse { .. }));
    }
}

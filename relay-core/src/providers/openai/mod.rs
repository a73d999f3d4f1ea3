//! OpenAI-compatible chat completion mapper
//!
//! Used for OpenAI itself and for Cerebras, which exposes the same schema.
//! Each instance resolves model names through its own provider table.

pub mod converter;
pub mod types;

pub use types::{OpenAiRequest, OpenAiResponse};

use crate::protocol::types::{CanonicalRequest, CanonicalResponse};
use crate::providers::adapter::{ProviderKind, SchemaMapper};
use crate::providers::error::RelayError;
use crate::providers::models;
use serde_json::Value;

pub static OPENAI: OpenAiCompatMapper = OpenAiCompatMapper::new(ProviderKind::OpenAi);
pub static CEREBRAS: OpenAiCompatMapper = OpenAiCompatMapper::new(ProviderKind::Cerebras);

/// Mapper for providers speaking the OpenAI chat completion schema
#[derive(Debug)]
pub struct OpenAiCompatMapper {
    kind: ProviderKind,
}

impl OpenAiCompatMapper {
    pub const fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }
}

impl SchemaMapper for OpenAiCompatMapper {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn to_provider_request(&self, request: &CanonicalRequest) -> Result<Value, RelayError> {
        let body = converter::to_openai_request(
            request,
            models::resolve(self.kind, &request.model),
            self.clamp_max_tokens(request.max_tokens),
        );
        serde_json::to_value(body).map_err(|e| RelayError::BadRequest {
            message: format!("failed to encode {} request: {}", self.kind, e),
        })
    }

    fn to_canonical_response(
        &self,
        body: Value,
        requested_model: &str,
    ) -> Result<CanonicalResponse, RelayError> {
        let response: OpenAiResponse =
            serde_json::from_value(body).map_err(|e| RelayError::MalformedResponse {
                provider: self.kind.to_string(),
                message: e.to_string(),
            })?;
        converter::from_openai_response(response, self.kind.name(), requested_model)
    }
}

//! One attempt against one provider
//!
//! Builds the provider body (pass-through or mapped), sends it through the
//! transport and classifies the answer. Both direct forwarding and smart
//! balancing run their attempts through [`ProviderCall`].

use crate::config::SecretString;
use crate::http::{RequestOptions, Transport, UpstreamRequest, UpstreamResponse};
use crate::protocol::types::{CanonicalRequest, CanonicalResponse};
use crate::providers::adapter::{ProviderKind, Translation};
use crate::providers::error::RelayError;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Longest body excerpt written to logs
const LOG_SNIPPET_CHARS: usize = 500;

/// Successful provider answer
#[derive(Debug)]
pub enum ProviderReply {
    /// Mapped provider response converted to canonical form
    Canonical(CanonicalResponse),
    /// Upstream response to relay verbatim (pass-through providers and
    /// event streams)
    Raw(UpstreamResponse),
}

impl ProviderReply {
    pub fn canonical(&self) -> Option<&CanonicalResponse> {
        match self {
            ProviderReply::Canonical(response) => Some(response),
            ProviderReply::Raw(_) => None,
        }
    }
}

/// Parameters of a single provider attempt
#[derive(Debug, Clone)]
pub struct ProviderCall<'a> {
    pub kind: ProviderKind,
    /// Label used in errors and logs (registry name or kind)
    pub provider: &'a str,
    pub url: &'a str,
    pub api_key: &'a SecretString,
    pub request_id: Uuid,
}

/// Truncate a body for logging
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(LOG_SNIPPET_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

impl ProviderCall<'_> {
    /// Body to send: the client's JSON for pass-through providers, the mapped
    /// body otherwise
    pub fn build_body(
        &self,
        request: &CanonicalRequest,
        raw_body: &Value,
    ) -> Result<Value, RelayError> {
        match self.kind.translation() {
            Translation::Passthrough => Ok(raw_body.clone()),
            Translation::Mapped(mapper) => mapper.to_provider_request(request),
        }
    }

    /// Send one request and classify the response
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        request: &CanonicalRequest,
        raw_body: &Value,
    ) -> Result<ProviderReply, RelayError> {
        let body = self.build_body(request, raw_body)?;

        info!(
            "Calling {} ({}) [request_id: {}]",
            self.provider, self.kind, self.request_id
        );
        debug!("Target URL: {} [request_id: {}]", self.url, self.request_id);

        let upstream = UpstreamRequest {
            url: self.url.to_string(),
            headers: self.kind.headers(self.api_key),
            body,
            options: RequestOptions::with_request_id(self.request_id),
        };

        let response = transport
            .send(upstream)
            .await
            .map_err(|e| RelayError::Transport {
                provider: self.provider.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status;
        if !response.is_success() {
            let details = response.text().await.unwrap_or_default();
            warn!(
                "Provider {} returned {} [request_id: {}]: {}",
                self.provider,
                status,
                self.request_id,
                snippet(&details)
            );
            return Err(if status >= 500 {
                RelayError::ProviderServer {
                    provider: self.provider.to_string(),
                    status,
                    details,
                }
            } else {
                RelayError::ProviderClient {
                    provider: self.provider.to_string(),
                    status,
                    details,
                    target_url: self.url.to_string(),
                }
            });
        }

        let mapper = match self.kind.translation() {
            Translation::Passthrough => return Ok(ProviderReply::Raw(response)),
            Translation::Mapped(_) if response.is_event_stream() => {
                debug!(
                    "Relaying event stream from {} untranslated [request_id: {}]",
                    self.provider, self.request_id
                );
                return Ok(ProviderReply::Raw(response));
            }
            Translation::Mapped(mapper) => mapper,
        };

        let bytes = response.bytes().await.map_err(|e| RelayError::Transport {
            provider: self.provider.to_string(),
            message: e.to_string(),
        })?;
        let json: Value =
            serde_json::from_slice(&bytes).map_err(|e| RelayError::MalformedResponse {
                provider: self.provider.to_string(),
                message: format!("invalid JSON: {}", e),
            })?;

        let canonical = mapper.to_canonical_response(json, &request.model)?;
        info!(
            "{} answered with {} output tokens [request_id: {}]",
            self.provider, canonical.usage.output_tokens, self.request_id
        );
        Ok(ProviderReply::Canonical(canonical))
    }
}

//! Direct forwarding to a client-chosen provider endpoint
//!
//! Paths look like `/{provider}/{target}`: the first segment picks the
//! provider kind, the rest is the upstream URL (scheme optional). Each
//! forward runs under the bounded retry policy.

use crate::config::SecretString;
use crate::http::Transport;
use crate::protocol::types::CanonicalRequest;
use crate::providers::adapter::ProviderKind;
use crate::providers::call::{ProviderCall, ProviderReply};
use crate::providers::error::RelayError;
use crate::providers::retry::{RetryExecutor, RetryPolicy, RetryState};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Parsed `/{provider}/{target}` path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub kind: ProviderKind,
    pub url: String,
}

impl ForwardTarget {
    /// Parse a request path (and optional query string).
    ///
    /// The target gets `https://` prepended unless it already carries it; with
    /// `allow_http` an explicit `http://` is kept as well.
    pub fn parse(path: &str, query: Option<&str>, allow_http: bool) -> Result<Self, RelayError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let missing = || RelayError::BadRequest {
            message: "missing provider type and target URL".to_string(),
        };
        let (provider, rest) = trimmed.split_once('/').ok_or_else(missing)?;

        // Provider first: `/mistral/` is unsupported, not missing a target
        let kind = ProviderKind::parse(provider).ok_or_else(|| RelayError::UnsupportedProvider {
            provider: provider.to_string(),
            path: path.to_string(),
        })?;
        if rest.is_empty() {
            return Err(missing());
        }

        let keeps_scheme =
            rest.starts_with("https://") || (allow_http && rest.starts_with("http://"));
        let mut url = if keeps_scheme {
            rest.to_string()
        } else {
            format!("https://{}", rest)
        };

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        Ok(Self { kind, url })
    }
}

/// Successful forward
#[derive(Debug)]
pub struct ForwardOutcome {
    pub reply: ProviderReply,
    pub attempts: u32,
    pub delays: Vec<Duration>,
}

/// Forwards requests to a single target with retries
pub struct Forwarder {
    transport: Arc<dyn Transport>,
    retry: RetryExecutor,
}

impl Forwarder {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            retry: RetryExecutor::new(policy),
        }
    }

    /// Forward `raw_body` to `target`.
    ///
    /// Mapping failures on a 2xx answer are reported as bad requests; upstream
    /// client errors keep their status; retry exhaustion yields a 503.
    pub async fn forward(
        &self,
        target: &ForwardTarget,
        api_key: &SecretString,
        raw_body: Value,
        request_id: Uuid,
    ) -> Result<ForwardOutcome, RelayError> {
        let canonical = CanonicalRequest::from_value(raw_body.clone())?;

        let call = ProviderCall {
            kind: target.kind,
            provider: target.kind.name(),
            url: &target.url,
            api_key,
            request_id,
        };

        let call = &call;
        let canonical = &canonical;
        let raw_body = &raw_body;
        let transport = self.transport.as_ref();

        let result = self
            .retry
            .execute(move |_attempt| call.execute(transport, canonical, raw_body))
            .await;

        match result.outcome {
            Ok(reply) => {
                info!(
                    "Forwarded to {} in {} attempt(s) [request_id: {}]",
                    target.kind, result.attempts, request_id
                );
                Ok(ForwardOutcome {
                    reply,
                    attempts: result.attempts,
                    delays: result.delays,
                })
            }
            Err(err) => {
                if matches!(result.state, RetryState::ExhaustedRetryable { .. }) {
                    error!(
                        "Giving up on {} after {} attempts [request_id: {}]: {}",
                        target.url, result.attempts, request_id, err
                    );
                }
                Err(match err {
                    RelayError::EmptyCandidates { .. } | RelayError::MalformedResponse { .. } => {
                        RelayError::BadRequest {
                            message: err.to_string(),
                        }
                    }
                    other => other,
                })
            }
        }
    }
}

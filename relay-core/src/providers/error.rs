//! Relay error types and their HTTP status mapping

use crate::providers::adapter::ProviderKind;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Every failure the relay can report to a client or to the dispatcher
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Malformed path, unparseable body or a violated request invariant
    #[error("Bad Request: {message}")]
    BadRequest { message: String },

    /// No credential could be found in the request headers
    #[error("Missing API key (x-api-key, Authorization Bearer, or anthropic-api-key header)")]
    MissingApiKey,

    /// Path named a provider the relay does not know
    #[error(
        "Unsupported provider: \"{provider}\". Supported: {}. Full path: {path}",
        ProviderKind::supported_list()
    )]
    UnsupportedProvider { provider: String, path: String },

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Inbound per-second budget exhausted
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Upstream answered with a non-2xx status below 500
    #[error("Provider {provider} returned {status}: {details}")]
    ProviderClient {
        provider: String,
        status: u16,
        details: String,
        target_url: String,
    },

    /// Upstream answered with a 5xx status
    #[error("Provider {provider} returned {status}: {details}")]
    ProviderServer {
        provider: String,
        status: u16,
        details: String,
    },

    /// Connection, timeout or body read failure
    #[error("{message}")]
    Transport { provider: String, message: String },

    /// Provider answered 2xx without any candidate
    #[error("Provider {provider} returned no candidates")]
    EmptyCandidates { provider: String },

    /// Provider answered 2xx with a body that does not fit its schema
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    /// Retry cap reached on server errors
    #[error("Upstream service unavailable")]
    UpstreamUnavailable,

    /// Retry cap reached on transport errors
    #[error("Network error after {attempts} attempts: {message}")]
    NetworkExhausted { attempts: u32, message: String },

    /// Every dispatch candidate failed or was skipped
    #[error("All providers unavailable")]
    AllProvidersUnavailable,
}

impl RelayError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::MissingApiKey => 401,
            Self::UnsupportedProvider { .. } => 400,
            Self::MethodNotAllowed => 405,
            Self::RateLimited => 429,
            Self::ProviderClient { status, .. } => *status,
            Self::ProviderServer { .. } | Self::Transport { .. } => 503,
            Self::EmptyCandidates { .. } | Self::MalformedResponse { .. } => 400,
            Self::UpstreamUnavailable
            | Self::NetworkExhausted { .. }
            | Self::AllProvidersUnavailable => 503,
        }
    }

    /// Whether another attempt against the same target may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderServer { .. } | Self::Transport { .. })
    }

    /// JSON error envelope for upstream client errors; every other error is
    /// reported as plain text.
    pub fn envelope(&self) -> Option<Value> {
        match self {
            Self::ProviderClient {
                provider,
                status,
                details,
                target_url,
            } => Some(json!({
                "error": {
                    "type": "provider_error",
                    "message": format!(
                        "Provider {} returned {}: {}",
                        provider,
                        status,
                        reason_phrase(*status)
                    ),
                    "details": details,
                    "provider": provider,
                    "target_url": target_url,
                }
            })),
            _ => None,
        }
    }

    /// Provider the failure came from, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderClient { provider, .. }
            | Self::ProviderServer { provider, .. }
            | Self::Transport { provider, .. }
            | Self::EmptyCandidates { provider }
            | Self::MalformedResponse { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

fn reason_phrase(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

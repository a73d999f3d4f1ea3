//! Provider kinds and the schema mapper seam
//!
//! `ProviderKind` names every upstream the relay can talk to. Each kind knows
//! its outbound headers and how bodies are translated: either the provider
//! already speaks the canonical format (pass-through) or a `SchemaMapper`
//! converts in both directions.

use crate::config::SecretString;
use crate::protocol::types::{CanonicalRequest, CanonicalResponse};
use crate::providers::error::RelayError;
use crate::providers::{gemini, openai, qwen};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Bidirectional translation between the canonical format and one provider
/// family's native schema
pub trait SchemaMapper: Send + Sync {
    /// Provider this mapper targets
    fn provider(&self) -> ProviderKind;

    /// Build the provider-native request body
    fn to_provider_request(&self, request: &CanonicalRequest) -> Result<Value, RelayError>;

    /// Convert a provider-native response body. `requested_model` is the
    /// canonical model the client asked for and is echoed back.
    fn to_canonical_response(
        &self,
        body: Value,
        requested_model: &str,
    ) -> Result<CanonicalResponse, RelayError>;

    /// Largest `max_tokens` the provider accepts, if it has a ceiling
    fn max_output_tokens(&self) -> Option<u32> {
        None
    }

    /// Clamp a requested `max_tokens` to the provider ceiling
    fn clamp_max_tokens(&self, max_tokens: Option<u32>) -> Option<u32> {
        match (max_tokens, self.max_output_tokens()) {
            (Some(requested), Some(ceiling)) => Some(requested.min(ceiling)),
            (requested, _) => requested,
        }
    }
}

/// How request and response bodies cross the provider boundary
#[derive(Clone, Copy)]
pub enum Translation {
    /// Provider speaks the canonical format, bodies are forwarded verbatim
    Passthrough,
    /// Bodies are converted by the mapper
    Mapped(&'static dyn SchemaMapper),
}

impl Translation {
    /// The mapper, if bodies are converted
    pub fn mapper(&self) -> Option<&'static dyn SchemaMapper> {
        match self {
            Translation::Passthrough => None,
            Translation::Mapped(mapper) => Some(*mapper),
        }
    }
}

impl fmt::Debug for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Passthrough => write!(f, "Passthrough"),
            Translation::Mapped(mapper) => write!(f, "Mapped({})", mapper.provider()),
        }
    }
}

/// Supported upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Qwen,
    #[serde(rename = "anyrouter")]
    AnyRouter,
    Cerebras,
}

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Browser-like header set AnyRouter expects in front of its API
const ANYROUTER_BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Origin", "https://anyrouter.top"),
    ("Referer", "https://anyrouter.top/"),
    (
        "Sec-Ch-Ua",
        "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
    ),
    ("Sec-Ch-Ua-Mobile", "?0"),
    ("Sec-Ch-Ua-Platform", "\"macOS\""),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "same-origin"),
];

impl ProviderKind {
    /// All kinds, in the order they are advertised to clients
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::Qwen,
        ProviderKind::AnyRouter,
        ProviderKind::Cerebras,
    ];

    /// Lowercase identifier used in paths, headers and configuration
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Qwen => "qwen",
            ProviderKind::AnyRouter => "anyrouter",
            ProviderKind::Cerebras => "cerebras",
        }
    }

    /// Parse a provider identifier (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Comma separated list of every supported identifier
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// How bodies are translated for this provider
    pub fn translation(&self) -> Translation {
        match self {
            ProviderKind::Anthropic | ProviderKind::AnyRouter => Translation::Passthrough,
            ProviderKind::Gemini => Translation::Mapped(&gemini::GEMINI),
            ProviderKind::OpenAi => Translation::Mapped(&openai::OPENAI),
            ProviderKind::Cerebras => Translation::Mapped(&openai::CEREBRAS),
            ProviderKind::Qwen => Translation::Mapped(&qwen::QWEN),
        }
    }

    /// Headers required by this provider, `Content-Type` included
    pub fn headers(&self, api_key: &SecretString) -> HashMap<String, String> {
        let key = api_key.expose_secret();
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        match self {
            ProviderKind::Anthropic => {
                headers.insert("x-api-key".to_string(), key.to_string());
                headers.insert("Authorization".to_string(), format!("Bearer {}", key));
                headers.insert(
                    "anthropic-version".to_string(),
                    ANTHROPIC_VERSION.to_string(),
                );
            }
            ProviderKind::AnyRouter => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", key));
                for (name, value) in ANYROUTER_BROWSER_HEADERS {
                    headers.insert(name.to_string(), value.to_string());
                }
            }
            ProviderKind::Gemini => {
                headers.insert("x-goog-api-key".to_string(), key.to_string());
            }
            ProviderKind::OpenAi | ProviderKind::Qwen | ProviderKind::Cerebras => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", key));
            }
        }

        headers
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| RelayError::UnsupportedProvider {
            provider: s.to_string(),
            path: String::new(),
        })
    }
}

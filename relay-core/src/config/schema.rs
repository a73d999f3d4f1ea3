//! Configuration schema structures with serde support
//!
//! Every section has defaults, so an empty file (or no file at all) yields
//! the built-in provider registry listening on `0.0.0.0:8787`.

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::providers::adapter::ProviderKind;
use crate::providers::registry::{CostTier, HealthPolicy};
use crate::providers::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Schema version understood by this release
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inbound request budget
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Single-provider forwarding retry policy
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Outbound HTTP client settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Provider health bookkeeping for balancing
    #[serde(default)]
    pub health: HealthPolicy,

    #[serde(default)]
    pub forwarding: ForwardingConfig,

    /// Balancing registry, in tie-break order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy::default(),
            connection: ConnectionConfig::default(),
            health: HealthPolicy::default(),
            forwarding: ForwardingConfig::default(),
            providers: default_providers(),
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Process-wide inbound request budget
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Milliseconds to wait for response headers, and for each chunk of a
    /// streamed body
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }
}

/// Direct forwarding settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardingConfig {
    /// Accept `http://` targets instead of forcing `https://`
    #[serde(default)]
    pub allow_http: bool,
}

/// One balancing registry entry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Registry name; defaults to the kind identifier
    #[serde(default)]
    pub name: Option<String>,

    /// Endpoint URL, may contain `{model}`
    pub base_url: String,

    pub cost_tier: CostTier,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Server-side key used when the request carries none for this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, cost_tier: CostTier) -> Self {
        Self {
            kind,
            name: None,
            base_url: base_url.into(),
            cost_tier,
            enabled: true,
            api_key: None,
        }
    }

    /// Effective registry name
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.name())
    }
}

/// Built-in registry, cheapest first
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(
            ProviderKind::AnyRouter,
            "https://anyrouter.top/v1/messages",
            CostTier::Free,
        ),
        ProviderConfig::new(
            ProviderKind::Gemini,
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent",
            CostTier::Free,
        ),
        ProviderConfig::new(
            ProviderKind::Qwen,
            "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
            CostTier::Cheap,
        ),
        ProviderConfig::new(
            ProviderKind::Cerebras,
            "https://api.cerebras.ai/v1/chat/completions",
            CostTier::Cheap,
        ),
        ProviderConfig::new(
            ProviderKind::OpenAi,
            "https://api.openai.com/v1/chat/completions",
            CostTier::Paid,
        ),
        ProviderConfig::new(
            ProviderKind::Anthropic,
            "https://api.anthropic.com/v1/messages",
            CostTier::Paid,
        ),
    ]
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8787 }
fn default_log_level() -> String { "info".to_string() }
fn default_requests_per_second() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_request_timeout() -> u64 { 60_000 }
fn default_max_idle() -> usize { 10 }

impl RelayConfig {
    /// Validate the structural rules of the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    expected: CONFIG_VERSION.to_string(),
                    found: self.version.clone(),
                },
            ));
        }

        if self.rate_limit.requests_per_second == 0 {
            return Err(ValidationError::out_of_range(
                "rate_limit.requests_per_second",
                "Must be greater than 0",
            ));
        }

        self.retry.validate("retry")?;
        self.health.validate("health")?;

        if self.connection.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                "connection.connect_timeout_ms",
                "Must be greater than 0",
            ));
        }
        if self.connection.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                "connection.request_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.providers.is_empty() {
            return Err(ValidationError::required("providers")
                .with_hint("at least one provider must be configured"));
        }

        let mut seen_names = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_names.insert(provider.name().to_ascii_lowercase()) {
                return Err(ValidationError::new(
                    format!("providers[{}].name", i),
                    ValidationErrorKind::DuplicateName {
                        name: provider.name().to_string(),
                    },
                ));
            }
            provider.validate(&format!("providers[{}]", i))?;
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Validate a registry entry
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name().is_empty() {
            return Err(ValidationError::required(format!("{}.name", path)));
        }

        if self.base_url.is_empty() {
            return Err(ValidationError::required(format!("{}.base_url", path)));
        }

        let probe = self.base_url.replace("{model}", "model");
        match url::Url::parse(&probe) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
            Ok(url) => Err(ValidationError::new(
                format!("{}.base_url", path),
                ValidationErrorKind::InvalidUrl {
                    message: format!("URL scheme must be http or https, got: {}", url.scheme()),
                },
            )),
            Err(e) => Err(ValidationError::new(
                format!("{}.base_url", path),
                ValidationErrorKind::InvalidUrl {
                    message: e.to_string(),
                },
            )),
        }
    }
}

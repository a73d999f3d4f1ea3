//! API key extraction from inbound request headers

use crate::config::SecretString;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use std::collections::HashMap;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    header_value(headers, AUTHORIZATION.as_str()).and_then(|value| {
        value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Forwarding credential: `x-api-key`, then `Authorization: Bearer`, then
/// `anthropic-api-key`
pub fn extract_api_key(headers: &HeaderMap) -> Option<SecretString> {
    header_value(headers, "x-api-key")
        .or_else(|| bearer_token(headers))
        .or_else(|| header_value(headers, "anthropic-api-key"))
        .map(SecretString::new)
}

/// Balancing credentials: a key per provider plus the shared forwarding key
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    per_provider: HashMap<String, SecretString>,
    shared: Option<SecretString>,
}

impl ProviderKeys {
    /// Collect `x-<provider>-key` headers for the given provider names and the
    /// shared key
    pub fn from_headers<'a>(
        headers: &HeaderMap,
        provider_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let per_provider = provider_names
            .into_iter()
            .filter_map(|name| {
                header_value(headers, &format!("x-{}-key", name.to_ascii_lowercase()))
                    .map(|key| (name.to_string(), SecretString::new(key)))
            })
            .collect();

        Self {
            per_provider,
            shared: extract_api_key(headers),
        }
    }

    /// Add or replace a provider specific key
    pub fn with_key(mut self, provider: impl Into<String>, key: impl Into<SecretString>) -> Self {
        self.per_provider.insert(provider.into(), key.into());
        self
    }

    /// Key for `provider`: its own header first, then the shared key
    pub fn key_for(&self, provider: &str) -> Option<&SecretString> {
        self.per_provider.get(provider).or(self.shared.as_ref())
    }
}

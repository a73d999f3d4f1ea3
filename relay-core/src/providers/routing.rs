//! Smart balancing across the provider registry
//!
//! The dispatcher turns a preference into an ordered candidate list and tries
//! each candidate once. Candidates without a credential are skipped without
//! touching their health; every other failure counts against the provider
//! and moves on to the next one.

use crate::http::{ProviderKeys, Transport};
use crate::protocol::types::CanonicalRequest;
use crate::providers::call::{ProviderCall, ProviderReply};
use crate::providers::error::RelayError;
use crate::providers::models;
use crate::providers::registry::{ProviderDescriptor, ProviderRegistry};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Which provider the client asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preference {
    /// Cheapest healthy provider first
    Auto,
    /// Named provider first, then everything else in registry order
    Named(String),
}

impl Preference {
    /// Parse one preference value; empty or `auto` means automatic
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Preference::Auto,
            Some(v) if v.eq_ignore_ascii_case("auto") => Preference::Auto,
            Some(v) => Preference::Named(v.to_ascii_lowercase()),
        }
    }

    /// Path segment wins over the `x-provider` header
    pub fn from_request(path_segment: Option<&str>, header: Option<&str>) -> Self {
        match path_segment.map(str::trim).filter(|s| !s.is_empty()) {
            Some(segment) => Self::parse(Some(segment)),
            None => Self::parse(header),
        }
    }
}

/// Result of a dispatch
#[derive(Debug)]
pub struct DispatchResult {
    /// The successful answer
    pub reply: ProviderReply,

    /// Which provider ultimately succeeded
    pub provider_used: String,

    /// Whether the winner was not the first candidate
    pub used_fallback: bool,

    /// Number of providers actually called
    pub attempts: usize,

    /// Errors encountered per provider
    pub provider_errors: HashMap<String, String>,

    /// Candidates skipped for lack of a credential
    pub skipped: Vec<String>,
}

/// Routes a canonical request across the registry
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Candidate order for a preference, evaluated now
    pub fn candidate_order(&self, preference: &Preference) -> Vec<Arc<ProviderDescriptor>> {
        self.candidate_order_at(preference, Utc::now())
    }

    /// Candidate order for a preference at `now`.
    ///
    /// - `Auto`: available providers, stable-sorted by cost tier
    /// - known name: that provider, then the rest in registry order,
    ///   regardless of health
    /// - unknown name: the whole registry in order
    pub fn candidate_order_at(
        &self,
        preference: &Preference,
        now: DateTime<Utc>,
    ) -> Vec<Arc<ProviderDescriptor>> {
        match preference {
            Preference::Auto => {
                let mut available = self.registry.available_at(now);
                available.sort_by_key(|p| p.cost_tier);
                available
            }
            Preference::Named(name) => match self.registry.get(name) {
                Some(preferred) => std::iter::once(Arc::clone(&preferred))
                    .chain(
                        self.registry
                            .list()
                            .iter()
                            .filter(|p| !Arc::ptr_eq(p, &preferred))
                            .cloned(),
                    )
                    .collect(),
                None => self.registry.list().to_vec(),
            },
        }
    }

    /// Try each candidate once until one succeeds
    pub async fn dispatch(
        &self,
        preference: &Preference,
        keys: &ProviderKeys,
        raw_body: Value,
        request_id: Uuid,
    ) -> Result<DispatchResult, RelayError> {
        let canonical = CanonicalRequest::from_value(raw_body.clone())?;
        let candidates = self.candidate_order(preference);

        debug!(
            "Dispatch order {:?} for {:?} [request_id: {}]",
            candidates.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            preference,
            request_id
        );

        let mut attempts = 0;
        let mut provider_errors = HashMap::new();
        let mut skipped = Vec::new();

        for (position, provider) in candidates.iter().enumerate() {
            let Some(api_key) = keys
                .key_for(&provider.name)
                .or(provider.api_key.as_ref())
            else {
                debug!(
                    "Skipping {}: no API key [request_id: {}]",
                    provider.name, request_id
                );
                skipped.push(provider.name.clone());
                continue;
            };

            let native_model = models::resolve(provider.kind, &canonical.model);
            let url = provider.endpoint(&native_model);
            let call = ProviderCall {
                kind: provider.kind,
                provider: &provider.name,
                url: &url,
                api_key,
                request_id,
            };

            attempts += 1;
            match call
                .execute(self.transport.as_ref(), &canonical, &raw_body)
                .await
            {
                Ok(reply) => {
                    self.registry.mark_success(&provider.name);
                    info!(
                        "Balanced to {} after {} attempt(s) [request_id: {}]",
                        provider.name, attempts, request_id
                    );
                    return Ok(DispatchResult {
                        reply,
                        provider_used: provider.name.clone(),
                        used_fallback: position > 0,
                        attempts,
                        provider_errors,
                        skipped,
                    });
                }
                Err(err) => {
                    let health = self.registry.mark_failure(&provider.name);
                    warn!(
                        "Provider {} failed [request_id: {}]: {} (health: {:?})",
                        provider.name, request_id, err, health
                    );
                    provider_errors.insert(provider.name.clone(), err.to_string());
                }
            }
        }

        error!(
            "All providers unavailable: {} attempted, {} skipped [request_id: {}]",
            attempts,
            skipped.len(),
            request_id
        );
        Err(RelayError::AllProvidersUnavailable)
    }
}

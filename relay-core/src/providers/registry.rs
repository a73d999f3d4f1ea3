//! Provider registry with health bookkeeping
//!
//! The registry is built once at start-up from configuration and shared by
//! reference. Each descriptor guards its own health counters with a mutex so
//! concurrent requests can record outcomes independently.
//!
//! A provider turns unhealthy after `failure_threshold` consecutive failures
//! and is then skipped by automatic selection. With `recovery_secs` set it
//! becomes eligible again once the window since its last failure has passed
//! (half-open); the next outcome decides whether it stays.

use crate::config::{ProviderConfig, RelayConfig, SecretString, ValidationError};
use crate::providers::adapter::ProviderKind;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Relative price class, used to order automatic selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Free,
    Cheap,
    Paid,
}

/// Health thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthPolicy {
    /// Consecutive failures before a provider is marked unhealthy
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds after the last failure before an unhealthy provider is tried
    /// again by automatic selection. Unset means never.
    #[serde(default)]
    pub recovery_secs: Option<u64>,
}

fn default_failure_threshold() -> u32 {
    3
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_secs: None,
        }
    }
}

impl HealthPolicy {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.failure_threshold == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.failure_threshold", path),
                "Must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Snapshot of a provider's health counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthState {
    pub healthy: bool,
    pub fail_count: u32,
    pub last_failure: Option<DateTime<Utc>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            healthy: true,
            fail_count: 0,
            last_failure: None,
        }
    }
}

/// A registered upstream provider
#[derive(Debug)]
pub struct ProviderDescriptor {
    pub kind: ProviderKind,
    pub name: String,
    /// Endpoint URL; `{model}` is replaced with the native model id
    pub base_url_template: String,
    pub cost_tier: CostTier,
    /// Server-side fallback credential
    pub api_key: Option<SecretString>,
    health: Mutex<HealthState>,
}

impl ProviderDescriptor {
    pub fn new(
        kind: ProviderKind,
        name: impl Into<String>,
        base_url_template: impl Into<String>,
        cost_tier: CostTier,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            base_url_template: base_url_template.into(),
            cost_tier,
            api_key: None,
            health: Mutex::new(HealthState::default()),
        }
    }

    fn from_config(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            ..Self::new(
                config.kind,
                config.name(),
                config.base_url.clone(),
                config.cost_tier,
            )
        }
    }

    /// Endpoint for a resolved native model
    pub fn endpoint(&self, native_model: &str) -> String {
        self.base_url_template.replace("{model}", native_model)
    }

    /// Current health counters
    pub fn health(&self) -> HealthState {
        self.health.lock().clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.health.lock().healthy
    }
}

/// Registry of balancing providers, in configuration order
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: Vec<Arc<ProviderDescriptor>>,
    index: HashMap<String, usize>,
    policy: HealthPolicy,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            providers: Vec::new(),
            index: HashMap::new(),
            policy,
        }
    }

    /// Registry of the enabled providers in `config`
    pub fn from_config(config: &RelayConfig) -> Self {
        let mut registry = Self::new(config.health.clone());
        for provider in config.providers.iter().filter(|p| p.enabled) {
            registry.register(ProviderDescriptor::from_config(provider));
        }
        registry
    }

    /// Add a provider at the end of the order. A provider with the same name
    /// is replaced in place.
    pub fn register(&mut self, descriptor: ProviderDescriptor) {
        let key = descriptor.name.to_ascii_lowercase();
        let descriptor = Arc::new(descriptor);
        match self.index.get(&key) {
            Some(&position) => self.providers[position] = descriptor,
            None => {
                self.index.insert(key, self.providers.len());
                self.providers.push(descriptor);
            }
        }
    }

    /// Look up a provider by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<ProviderDescriptor>> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&position| Arc::clone(&self.providers[position]))
    }

    /// All providers in registry order
    pub fn list(&self) -> &[Arc<ProviderDescriptor>] {
        &self.providers
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name.as_str())
    }

    /// Record a success: counters reset, provider healthy again
    pub fn mark_success(&self, name: &str) -> Option<HealthState> {
        let provider = self.get(name)?;
        let mut health = provider.health.lock();
        if !health.healthy {
            info!("Provider {} recovered", provider.name);
        }
        *health = HealthState::default();
        Some(health.clone())
    }

    /// Record a failure observed now
    pub fn mark_failure(&self, name: &str) -> Option<HealthState> {
        self.mark_failure_at(name, Utc::now())
    }

    /// Record a failure observed at `now`
    pub fn mark_failure_at(&self, name: &str, now: DateTime<Utc>) -> Option<HealthState> {
        let provider = self.get(name)?;
        let mut health = provider.health.lock();
        health.fail_count = health.fail_count.saturating_add(1);
        health.last_failure = Some(now);
        if health.healthy && health.fail_count >= self.policy.failure_threshold {
            health.healthy = false;
            warn!(
                "Provider {} marked unhealthy after {} consecutive failures",
                provider.name, health.fail_count
            );
        }
        Some(health.clone())
    }

    /// Whether automatic selection may use `provider` at `now`
    pub fn is_available_at(&self, provider: &ProviderDescriptor, now: DateTime<Utc>) -> bool {
        let health = provider.health.lock();
        if health.healthy {
            return true;
        }
        match (self.policy.recovery_secs, health.last_failure) {
            (Some(secs), Some(last_failure)) => {
                let window = ChronoDuration::seconds(i64::try_from(secs).unwrap_or(i64::MAX));
                now.signed_duration_since(last_failure) >= window
            }
            _ => false,
        }
    }

    /// Providers automatic selection may use now, in registry order
    pub fn available(&self) -> Vec<Arc<ProviderDescriptor>> {
        self.available_at(Utc::now())
    }

    pub fn available_at(&self, now: DateTime<Utc>) -> Vec<Arc<ProviderDescriptor>> {
        self.providers
            .iter()
            .filter(|p| self.is_available_at(p, now))
            .cloned()
            .collect()
    }
}

impl Default for ProviderRegistry {
    /// The built-in registry with default health policy
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let registry = ProviderRegistry::default();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["anyrouter", "gemini", "qwen", "cerebras", "openai", "anthropic"]
        );
    }

    #[test]
    fn test_cost_tier_ordering() {
        assert!(CostTier::Free < CostTier::Cheap);
        assert!(CostTier::Cheap < CostTier::Paid);
    }

    #[test]
    fn test_endpoint_template() {
        let registry = ProviderRegistry::default();
        let gemini = registry.get("GEMINI").unwrap();
        assert_eq!(
            gemini.endpoint("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ProviderRegistry::new(HealthPolicy::default());
        registry.register(ProviderDescriptor::new(
            ProviderKind::OpenAi,
            "openai",
            "https://a.example/v1",
            CostTier::Paid,
        ));
        registry.register(ProviderDescriptor::new(
            ProviderKind::OpenAi,
            "openai",
            "https://b.example/v1",
            CostTier::Cheap,
        ));

        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.get("openai").unwrap().cost_tier, CostTier::Cheap);
    }

    #[test]
    fn test_unknown_name_is_ignored() {
        let registry = ProviderRegistry::default();
        assert!(registry.mark_failure("nope").is_none());
        assert!(registry.mark_success("nope").is_none());
    }
}

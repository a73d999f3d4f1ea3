//! Configuration validation utilities

use super::env::ENV_VAR_PATTERN;
use super::error::ValidationError;
use super::schema::RelayConfig;
use tracing::warn;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validator with rules that span sections
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_enabled_providers(config)?;
        self.validate_logging(config)?;
        self.warn_on_inline_keys(config);

        Ok(())
    }

    fn validate_enabled_providers(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        if !config.providers.iter().any(|p| p.enabled) {
            return Err(ValidationError::rejected(
                "providers",
                "at least one provider must be enabled",
            ));
        }
        Ok(())
    }

    /// Accepts a bare level or an `EnvFilter` directive list
    fn validate_logging(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let level = config.logging.level.trim();
        if level.is_empty() {
            return Err(ValidationError::required("logging.level"));
        }
        let is_directive = level.contains('=') || level.contains(',');
        if !is_directive && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ValidationError::rejected(
                "logging.level",
                format!("unknown log level '{}'", level),
            )
            .with_hint("expected one of trace, debug, info, warn, error, off"));
        }
        Ok(())
    }

    fn warn_on_inline_keys(&self, config: &RelayConfig) {
        for provider in &config.providers {
            if let Some(key) = &provider.api_key {
                if key.is_empty() {
                    warn!("provider {} has an empty api_key in config", provider.name());
                }
            }
        }
    }

    /// Environment variables referenced by a raw configuration document
    pub fn extract_env_vars(&self, text: &str) -> Vec<String> {
        ENV_VAR_PATTERN
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}

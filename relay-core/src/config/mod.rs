//! Relay configuration
//!
//! Loaded from YAML or JSON with `${ENV_VAR}` interpolation, then validated.
//! Every section has defaults, see [`RelayConfig`].

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    default_providers, ConnectionConfig, ForwardingConfig, LogFormat, LoggingConfig,
    ProviderConfig, RateLimitConfig, RelayConfig, ServerConfig, CONFIG_VERSION,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a configuration file, choosing the parser from the extension
pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(path),
        Some("json") => load_from_json(path),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_string_lossy().to_string(),
        }),
    }
}

fn read_interpolated(path: &Path) -> ConfigResult<String> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let vars = ConfigValidator::new().extract_env_vars(&content);
    if !vars.is_empty() {
        debug!("Interpolating {:?} into {}", vars, path.display());
    }
    env::interpolate_env_vars(&content)
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    // serde_yaml rejects an empty document; treat it as all defaults
    let document = if interpolated.trim().is_empty() {
        "{}"
    } else {
        interpolated.as_str()
    };

    let config: RelayConfig =
        serde_yaml::from_str(document).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            position: e.location().map(|l| (l.line(), l.column())),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: RelayConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            position: Some((e.line(), e.column())),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

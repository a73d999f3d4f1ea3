//! Environment variable interpolation for configuration files

use super::error::ConfigError;
use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

/// `${NAME}` placeholders; names are upper-case identifiers
pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Replace every `${NAME}` in `content` with the variable's value.
///
/// Fails on the first variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    if let Some(missing) = ENV_VAR_PATTERN
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .find(|name| env::var(name).is_err())
    {
        return Err(ConfigError::MissingEnvVar { var: missing });
    }

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &Captures| {
        env::var(&cap[1]).unwrap_or_default()
    });
    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("RELAY_TEST_VAR", "test_value");

        let content = "api_key: ${RELAY_TEST_VAR}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "api_key: test_value");

        env::remove_var("RELAY_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let content = "api_key: ${RELAY_MISSING_VAR}";
        let result = interpolate_env_vars(content);

        match result {
            Err(ConfigError::MissingEnvVar { var }) => assert_eq!(var, "RELAY_MISSING_VAR"),
            other => panic!("Expected MissingEnvVar error, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_and_lowercase_placeholders() {
        env::set_var("RELAY_REPEAT", "v");

        let content = "a: ${RELAY_REPEAT}, b: ${RELAY_REPEAT}, c: ${lower}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "a: v, b: v, c: ${lower}");

        env::remove_var("RELAY_REPEAT");
    }
}

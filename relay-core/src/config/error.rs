//! Errors raised while loading and checking relay configuration

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse '{path}'{}: {message}", position_suffix(.position))]
    Parse {
        path: String,
        /// 1-based (line, column) when the parser reports one
        position: Option<(usize, usize)>,
        message: String,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("environment variable '{var}' referenced in config is not set")]
    MissingEnvVar { var: String },

    #[error("unsupported config format for '{path}' (use .yaml, .yml or .json)")]
    UnsupportedFormat { path: String },
}

fn position_suffix(position: &Option<(usize, usize)>) -> String {
    match position {
        Some((line, column)) => format!(" at {}:{}", line, column),
        None => String::new(),
    }
}

/// A rule the configuration breaks, tied to the offending field
#[derive(Debug, Error)]
pub struct ValidationError {
    /// Dotted path of the field, e.g. `providers[2].base_url`
    pub field: String,
    pub kind: ValidationErrorKind,
    pub hint: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config at '{}': {}", self.field, self.kind)?;
        match &self.hint {
            Some(hint) => write!(f, " ({})", hint),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("value is required")]
    Missing,

    #[error("out of range: {message}")]
    OutOfRange { message: String },

    #[error("provider name '{name}' is used more than once")]
    DuplicateName { name: String },

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("unsupported config version '{found}', expected '{expected}'")]
    UnsupportedVersion { expected: String, found: String },

    #[error("{message}")]
    Rejected { message: String },
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::Missing)
    }

    pub fn out_of_range(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::OutOfRange {
                message: message.into(),
            },
        )
    }

    pub fn rejected(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::Rejected {
                message: message.into(),
            },
        )
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

//! Transport error types

use thiserror::Error;

/// Failure to complete an HTTP exchange with an upstream
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Connection failed: {message}")]
    Connect { message: String },

    #[error("{message}")]
    Request { message: String },

    #[error("Failed to read response body: {message}")]
    Body { message: String },

    #[error("Response exceeds maximum size of {limit} bytes")]
    ResponseTooLarge { limit: usize },

    #[error("Failed to create HTTP client: {message}")]
    Build { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                message: err.to_string(),
            }
        }
    }
}

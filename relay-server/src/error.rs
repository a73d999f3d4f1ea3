//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::RelayError;
use thiserror::Error;

/// A [`RelayError`] rendered as an HTTP response.
///
/// Upstream client errors become the JSON `provider_error` envelope with the
/// upstream status; everything else is a plain-text body.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub RelayError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_GATEWAY)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.0.envelope() {
            Some(envelope) => (status, Json(envelope)).into_response(),
            None => (status, self.0.to_string()).into_response(),
        }
    }
}

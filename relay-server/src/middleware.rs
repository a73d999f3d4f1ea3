//! Request middleware

use crate::{error::ApiError, AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use relay_core::RelayError;
use tracing::warn;

/// Reject requests over the per-second budget before any other work
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.limiter.try_acquire() {
        warn!(
            "Rate limit exceeded ({} requests/s): {} {}",
            state.limiter.limit(),
            request.method(),
            request.uri().path()
        );
        return ApiError(RelayError::RateLimited).into_response();
    }
    next.run(request).await
}

//! # Relay Server
//!
//! Axum HTTP edge for the relay. Routes:
//! - `/health`, `/version`: liveness JSON, any method
//! - `POST /balance[/{preferred}]`: smart balancing across the registry
//! - `POST /{provider}/{target...}`: direct forwarding with bounded retries
//!
//! Every request first passes the process-wide rate limiter.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod telemetry;

pub use error::ApiError;

use axum::{extract::DefaultBodyLimit, routing::any, Router};
use relay_core::config::RelayConfig;
use relay_core::http::{HttpClient, Transport, TransportError, MAX_BUFFERED_BODY};
use relay_core::providers::{Dispatcher, Forwarder, ProviderRegistry, RequestRateLimiter};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub forwarder: Arc<Forwarder>,
    pub dispatcher: Arc<Dispatcher>,
    pub limiter: Arc<RequestRateLimiter>,
}

impl AppState {
    /// State backed by a pooled HTTP client built from `config.connection`
    pub fn new(config: RelayConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpClient::from_config(&config.connection)?);
        Ok(Self::with_transport(config, transport))
    }

    /// State sending upstream requests through `transport`
    pub fn with_transport(config: RelayConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = Arc::new(ProviderRegistry::from_config(&config));
        Self {
            forwarder: Arc::new(Forwarder::new(
                Arc::clone(&transport),
                config.retry.clone(),
            )),
            dispatcher: Arc::new(Dispatcher::new(registry, transport)),
            limiter: Arc::new(RequestRateLimiter::new(
                config.rate_limit.requests_per_second,
            )),
            config: Arc::new(config),
        }
    }
}

/// Create the relay router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", any(handlers::health))
        .route("/version", any(handlers::health))
        .route("/balance", any(handlers::balance))
        .route("/balance/:preferred", any(handlers::balance_preferred))
        .route("/balance/:preferred/*rest", any(handlers::balance_preferred))
        .fallback(handlers::forward)
        .layer(DefaultBodyLimit::max(MAX_BUFFERED_BODY))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

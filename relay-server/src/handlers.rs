//! Request handlers for the relay endpoints

use crate::{error::ApiError, AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use relay_core::http::{extract_api_key, ProviderKeys, UpstreamResponse};
use relay_core::providers::{ForwardTarget, Preference, ProviderReply};
use relay_core::RelayError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Response header naming the provider that answered
pub const PROVIDER_HEADER: &str = "x-relay-provider";

const FEATURES: &[&str] = &["multi-header-auth", "smart-balance", "debug-logging"];

/// Headers that describe the upstream connection rather than the payload
const HOP_BY_HOP: [HeaderName; 3] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Body of `/health` and `/version`
/// Version reported by `/health` and `/version`
pub const SERVICE_VERSION: &str = "2.0.0";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub version: &'static str,
    pub timestamp: String,
    pub status: &'static str,
    pub features: &'static [&'static str],
    pub method: String,
}

/// `/health` and `/version`, any method
pub async fn health(method: Method) -> Json<HealthResponse> {
    Json(HealthResponse {
        version: SERVICE_VERSION,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        status: "ok",
        features: FEATURES,
        method: method.to_string(),
    })
}

/// `POST /{provider}/{target...}`: forward to a single provider with retries
pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_post(&method)?;

    let target = ForwardTarget::parse(
        uri.path(),
        uri.query(),
        state.config.forwarding.allow_http,
    )?;
    let api_key = extract_api_key(&headers).ok_or(RelayError::MissingApiKey)?;
    let raw_body = parse_body(&body)?;

    let request_id = Uuid::new_v4();
    info!(
        "Forwarding to {} ({} bytes) [request_id: {}]",
        target.kind,
        body.len(),
        request_id
    );
    debug!(
        "Credential {} [request_id: {}]",
        api_key.partial_redact(),
        request_id
    );

    let outcome = state
        .forwarder
        .forward(&target, &api_key, raw_body, request_id)
        .await?;

    Ok(reply_response(outcome.reply, target.kind.name()))
}

/// `POST /balance`: automatic provider selection
pub async fn balance(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    run_balance(state, method, None, headers, body).await
}

/// `POST /balance/{preferred}[/...]`: named provider first
pub async fn balance_preferred(
    State(state): State<AppState>,
    method: Method,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let preferred = params.get("preferred").cloned();
    run_balance(state, method, preferred, headers, body).await
}

async fn run_balance(
    state: AppState,
    method: Method,
    preferred: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_post(&method)?;

    let header_preference = headers.get("x-provider").and_then(|v| v.to_str().ok());
    let preference = Preference::from_request(preferred.as_deref(), header_preference);

    let registry = state.dispatcher.registry();
    let keys = ProviderKeys::from_headers(&headers, registry.names());
    let raw_body = parse_body(&body)?;

    let request_id = Uuid::new_v4();
    info!(
        "Balancing request with preference {:?} [request_id: {}]",
        preference, request_id
    );

    let result = state
        .dispatcher
        .dispatch(&preference, &keys, raw_body, request_id)
        .await?;

    if !result.provider_errors.is_empty() {
        debug!(
            "Failed before success: {:?} [request_id: {}]",
            result.provider_errors, request_id
        );
    }

    Ok(reply_response(result.reply, &result.provider_used))
}

fn require_post(method: &Method) -> Result<(), RelayError> {
    if method == Method::POST {
        Ok(())
    } else {
        Err(RelayError::MethodNotAllowed)
    }
}

fn parse_body(body: &Bytes) -> Result<Value, RelayError> {
    serde_json::from_slice(body).map_err(|e| RelayError::BadRequest {
        message: format!("invalid JSON body: {}", e),
    })
}

fn reply_response(reply: ProviderReply, provider: &str) -> Response {
    let mut response = match reply {
        ProviderReply::Canonical(canonical) => Json(canonical).into_response(),
        ProviderReply::Raw(upstream) => relay_upstream(upstream),
    };
    if let Ok(value) = HeaderValue::from_str(provider) {
        response.headers_mut().insert(PROVIDER_HEADER, value);
    }
    response
}

/// Stream an upstream response back with its status and headers
fn relay_upstream(mut upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = std::mem::take(&mut upstream.headers);
    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    let mut response = Response::new(Body::from_stream(upstream.into_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

//! Outbound HTTP layer
//!
//! This module handles:
//! - The `Transport` seam the forwarder and dispatcher send requests through
//! - Connection pooling and client management (`client`)
//! - Request ID generation and correlation
//! - Credential extraction from inbound headers (`credentials`)

pub mod client;
pub mod credentials;
pub mod error;

pub use client::HttpClient;
pub use credentials::{extract_api_key, ProviderKeys};
pub use error::TransportError;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use http::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Largest upstream body the relay will buffer for mapping (10MB)
pub const MAX_BUFFERED_BODY: usize = 10 * 1024 * 1024;

/// Options for an outbound request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation, sent as `X-Request-ID`
    pub request_id: Uuid,
}

impl RequestOptions {
    /// Options correlated with an existing inbound request id
    pub fn with_request_id(request_id: Uuid) -> Self {
        Self { request_id }
    }
}

/// A JSON POST to an upstream provider
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub options: RequestOptions,
}

/// Body of an upstream response
pub enum UpstreamBody {
    /// Fully read body
    Buffered(Bytes),
    /// Body still arriving from the network
    Stream(BoxStream<'static, Result<Bytes, TransportError>>),
}

impl fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            UpstreamBody::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// Status, headers and body returned by an upstream provider
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    /// Response with an already buffered body
    pub fn buffered(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: UpstreamBody::Buffered(body.into()),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lower-cased `Content-Type`, if present
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
    }

    /// Whether the provider answered with server-sent events
    pub fn is_event_stream(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.contains("text/event-stream"))
    }

    /// Read the whole body, refusing anything larger than `MAX_BUFFERED_BODY`
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        match self.body {
            UpstreamBody::Buffered(bytes) => Ok(bytes),
            UpstreamBody::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if buffer.len() + chunk.len() > MAX_BUFFERED_BODY {
                        return Err(TransportError::ResponseTooLarge {
                            limit: MAX_BUFFERED_BODY,
                        });
                    }
                    buffer.extend_from_slice(&chunk);
                }
                Ok(buffer.freeze())
            }
        }
    }

    /// Read the body as UTF-8 text (lossy)
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Turn the body into a byte stream regardless of how it is held
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, TransportError>> {
        match self.body {
            UpstreamBody::Buffered(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            UpstreamBody::Stream(stream) => stream,
        }
    }
}

/// Sends upstream requests
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `request.body` as JSON and return the response without judging
    /// its status
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

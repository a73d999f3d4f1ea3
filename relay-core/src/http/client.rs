//! HTTP client implementation using reqwest

use crate::config::ConnectionConfig;
use crate::http::{Transport, TransportError, UpstreamBody, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default user agent
const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling.
///
/// `request_timeout` bounds the wait for the response head and every idle
/// gap while reading the body, never the body as a whole, so long streams
/// keep flowing as long as the upstream keeps sending.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    response_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::from_config(&ConnectionConfig::default())
    }

    /// Create a client from the `connection` configuration section
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, TransportError> {
        Self::with_config(
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
            config.max_idle_per_host,
        )
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(
        connect_timeout: Duration,
        request_timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .read_timeout(request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Build {
                message: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            response_timeout: request_timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let request_id = request.options.request_id;

        info!("POST {} [request_id: {}]", request.url, request_id);

        let mut req_builder = self.client.post(&request.url);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        // Add request ID header for correlation
        req_builder = req_builder
            .header("X-Request-ID", request_id.to_string())
            .json(&request.body);

        let sent = match tokio::time::timeout(self.response_timeout, req_builder.send()).await {
            Ok(result) => result.map_err(TransportError::from),
            Err(_) => Err(TransportError::Timeout {
                message: format!(
                    "no response within {}ms",
                    self.response_timeout.as_millis()
                ),
            }),
        };

        let response = sent.map_err(|err| {
            match &err {
                TransportError::Timeout { .. } => {
                    warn!("Request timeout for {} [request_id: {}]", request.url, request_id)
                }
                _ => error!(
                    "Request error for {} [request_id: {}]: {}",
                    request.url, request_id, err
                ),
            }
            err
        })?;

        let status = response.status().as_u16();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(TransportError::from);

        Ok(UpstreamResponse {
            status,
            headers,
            body: UpstreamBody::Stream(Box::pin(body)),
        })
    }
}

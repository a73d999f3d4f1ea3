//! Shared helpers for relay-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use relay_core::http::{Transport, TransportError, UpstreamRequest, UpstreamResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted upstream outcome
#[derive(Debug, Clone)]
pub enum Scripted {
    Json(u16, Value),
    Text(u16, &'static str),
    EventStream(&'static str),
    Fail(&'static str),
}

/// Transport answering from per-URL scripts and recording every request.
///
/// Routes match when the request URL contains the fragment. The last
/// scripted outcome of a route repeats once the queue is drained.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url_fragment: &str, outcomes: Vec<Scripted>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((url_fragment.to_string(), outcomes.into()));
        self
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    fn next_outcome(&self, url: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let (_, queue) = routes.iter_mut().find(|(fragment, _)| url.contains(fragment))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let outcome = self.next_outcome(&url).ok_or_else(|| TransportError::Connect {
            message: format!("no route for {}", url),
        })?;

        let mut headers = HeaderMap::new();
        match outcome {
            Scripted::Json(status, body) => {
                headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                Ok(UpstreamResponse::buffered(status, headers, body.to_string()))
            }
            Scripted::Text(status, body) => {
                headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain"),
                );
                Ok(UpstreamResponse::buffered(status, headers, body))
            }
            Scripted::EventStream(body) => {
                headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("text/event-stream"),
                );
                Ok(UpstreamResponse::buffered(200, headers, body))
            }
            Scripted::Fail(message) => Err(TransportError::Connect {
                message: message.to_string(),
            }),
        }
    }
}

/// Minimal canonical request body
pub fn canonical_body(model: &str, text: &str) -> Value {
    serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": text}],
        "max_tokens": 50
    })
}

/// Gemini answer carrying `text`
pub fn gemini_ok(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}]}, "finishReason": "STOP"}],
        "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 1}
    })
}

/// OpenAI-compatible answer carrying `text`
pub fn openai_ok(text: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 1}
    })
}

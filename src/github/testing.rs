// src/github/testing.rs
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::error::TransportError;
use super::rate_limit::{REMAINING_HEADER, RESET_HEADER};
use super::transport::{ApiRequest, HttpResponse, Transport};

pub struct ResponseBuilder {
    response: HttpResponse,
}

pub fn response(status: u16, body: &str) -> ResponseBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    ResponseBuilder {
        response: HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: body.as_bytes().to_vec(),
        },
    }
}

impl ResponseBuilder {
    pub fn rate_limit(mut self, remaining: &str, reset: i64) -> Self {
        self.response.headers.insert(
            HeaderName::from_static(REMAINING_HEADER),
            HeaderValue::from_str(remaining).unwrap(),
        );
        self.response.headers.insert(
            HeaderName::from_static(RESET_HEADER),
            HeaderValue::from_str(&reset.to_string()).unwrap(),
        );
        self
    }

    pub fn build(self) -> HttpResponse {
        self.response
    }
}

/// Replays a fixed list of results and records every request it receives.
/// Once the script runs out, further calls fail with a transport error.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn connection_reset() -> TransportError {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".into()))
    }
}

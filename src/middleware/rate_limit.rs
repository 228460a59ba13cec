// src/middleware/rate_limit.rs
//
// Inbound throttling for routes that spend the server's GitHub credential.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::AppState;

pub struct RateLimiter {
    requests: RwLock<HashMap<String, RateLimitEntry>>,
    max_requests: usize,
    window: Duration,
}

struct RateLimitEntry {
    count: usize,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Count a request for `key`. Returns false once the key has used up its
    /// allowance for the current window.
    pub async fn check(&self, key: &str) -> bool {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        let entry = requests
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Drop entries whose window has passed (call this in a background task).
    pub async fn cleanup(&self) {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        requests.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
    }

    #[cfg(test)]
    pub async fn tracked_clients(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Client identifier from reverse-proxy headers.
pub fn extract_client_id(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().map(str::trim).filter(|ip| !ip.is_empty()) {
            return ip.to_string();
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        return real_ip.trim().to_string();
    }

    "unknown".to_string()
}

pub async fn proxy_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let client_id = extract_client_id(request.headers());

    if state.proxy_limiter.check(&client_id).await {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            "Proxy rate limit exceeded for client: {} on path: {}",
            client_id,
            request.uri().path()
        );
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_rate_limiting() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.check("test_client").await);
        }

        assert!(!limiter.check("test_client").await);
        assert!(limiter.check("other_client").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reset_and_cleanup() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.check("test").await);
        assert!(limiter.check("test").await);
        assert!(!limiter.check("test").await);

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_clients().await, 0);

        assert!(limiter.check("test").await);
    }

    #[test]
    fn test_extract_client_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_client_id(&headers), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_client_id(&headers), "10.0.0.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(extract_client_id(&headers), "203.0.113.7");
    }
}

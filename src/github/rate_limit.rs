// src/github/rate_limit.rs
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::RwLock;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Last observed upstream quota. Both fields start unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    /// Parse the quota headers of a single response. Returns `None` when the
    /// response carried neither header.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_str(headers, REMAINING_HEADER);
        let reset = header_str(headers, RESET_HEADER);
        if remaining.is_none() && reset.is_none() {
            return None;
        }

        Some(Self {
            remaining: remaining.and_then(|v| v.trim().parse().ok()),
            reset_at: reset
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

/// Shared tracker of the upstream rate-limit window.
#[derive(Default)]
pub struct RateLimitTracker {
    state: RwLock<RateLimitState>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the quota headers of a response. Last observation wins; the
    /// previous state is replaced wholesale, never merged.
    pub async fn observe(&self, headers: &HeaderMap) {
        if let Some(observed) = RateLimitState::from_headers(headers) {
            tracing::debug!(
                "Rate limit observed: remaining={:?} reset={:?}",
                observed.remaining,
                observed.reset_at
            );
            *self.state.write().await = observed;
        }
    }

    pub async fn remaining(&self) -> Option<u64> {
        self.state.read().await.remaining
    }

    pub async fn snapshot(&self) -> RateLimitState {
        *self.state.read().await
    }
}

/// A 403 is only a rate-limit condition when the remaining header is present
/// and literally `"0"`. A 403 without the header is an authorization failure.
pub fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::FORBIDDEN && header_str(headers, REMAINING_HEADER) == Some("0")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: Option<&'static str>, reset: Option<&'static str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(v) = remaining {
            map.insert(REMAINING_HEADER, HeaderValue::from_static(v));
        }
        if let Some(v) = reset {
            map.insert(RESET_HEADER, HeaderValue::from_static(v));
        }
        map
    }

    #[tokio::test]
    async fn test_starts_unknown() {
        let tracker = RateLimitTracker::new();
        assert_eq!(tracker.remaining().await, None);
        assert_eq!(tracker.snapshot().await.reset_at, None);
    }

    #[tokio::test]
    async fn test_observe_records_headers() {
        let tracker = RateLimitTracker::new();
        tracker
            .observe(&headers(Some("42"), Some("1700000000")))
            .await;

        assert_eq!(tracker.remaining().await, Some(42));
        assert_eq!(
            tracker.snapshot().await.reset_at,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[tokio::test]
    async fn test_last_observation_wins_without_merging() {
        let tracker = RateLimitTracker::new();
        tracker
            .observe(&headers(Some("42"), Some("1700000000")))
            .await;
        tracker.observe(&headers(Some("41"), None)).await;

        let state = tracker.snapshot().await;
        assert_eq!(state.remaining, Some(41));
        assert_eq!(state.reset_at, None);
    }

    #[tokio::test]
    async fn test_response_without_headers_leaves_state() {
        let tracker = RateLimitTracker::new();
        tracker.observe(&headers(Some("10"), None)).await;
        tracker.observe(&HeaderMap::new()).await;

        assert_eq!(tracker.remaining().await, Some(10));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            &headers(Some("0"), Some("1700000000"))
        ));
        // Header absent: plain authorization failure
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &HeaderMap::new()));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &headers(Some("3"), None)));
        assert!(!is_rate_limited(StatusCode::OK, &headers(Some("0"), None)));
    }
}

// src/github/error.rs
use chrono::{DateTime, Utc};

/// Boxed error produced by a [`Transport`](super::transport::Transport) when
/// no HTTP response could be obtained at all.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the GitHub access layer to its callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Upstream answered 403 with a remaining quota of zero, and waiting
    /// for the reset did not help within the retry budget.
    #[error("GitHub API rate limit exceeded, resets at {}", format_reset(*.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("invalid GitHub API token")]
    Unauthorized,

    /// 422 from the search endpoints, usually a query that is too complex.
    #[error("invalid search query: {message}")]
    InvalidQuery { message: String },

    #[error("GitHub API error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("max retries exceeded after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16 },

    #[error("request to GitHub failed: {0}")]
    Transport(#[source] TransportError),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Whether the failure was transient on the upstream side, as opposed to
    /// something the caller must change before trying again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::RetriesExhausted { .. } | ApiError::Transport(_) | ApiError::RateLimited { .. }
        )
    }
}

fn format_reset(reset_at: Option<DateTime<Utc>>) -> String {
    reset_at
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display_with_reset() {
        let reset_at = DateTime::from_timestamp(1_700_000_000, 0);
        let err = ApiError::RateLimited { reset_at };
        assert_eq!(
            err.to_string(),
            "GitHub API rate limit exceeded, resets at 22:13:20"
        );
    }

    #[test]
    fn rate_limited_display_without_reset() {
        let err = ApiError::RateLimited { reset_at: None };
        assert_eq!(
            err.to_string(),
            "GitHub API rate limit exceeded, resets at unknown"
        );
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!ApiError::Unauthorized.is_transient());
        assert!(!ApiError::InvalidQuery { message: "x".into() }.is_transient());
        assert!(ApiError::RetriesExhausted { attempts: 3, status: 500 }.is_transient());
    }
}

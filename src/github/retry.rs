// src/github/retry.rs
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use super::error::TransportError;
use super::rate_limit::{is_rate_limited, RateLimitState, RateLimitTracker};
use super::transport::{ApiRequest, HttpResponse, Transport};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const BASE_BACKOFF: Duration = Duration::from_millis(1000);
pub const RATE_LIMIT_WAIT_CEILING: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub rate_limit_ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: BASE_BACKOFF,
            rate_limit_ceiling: RATE_LIMIT_WAIT_CEILING,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Exponential backoff for the given zero-based attempt index.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }
}

/// What a single attempt produced, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Any status the caller should see as-is, including most 4xx.
    Completed,
    RateLimited,
    ServerError,
    TransportFailure,
}

impl Outcome {
    pub fn classify(status: StatusCode, headers: &HeaderMap) -> Self {
        if is_rate_limited(status, headers) {
            Outcome::RateLimited
        } else if status.is_server_error() {
            Outcome::ServerError
        } else {
            Outcome::Completed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Return,
    WaitForReset(Duration),
    Backoff(Duration),
    GiveUp,
}

/// Decide what follows attempt number `attempt` (zero-based).
pub fn next_action(
    policy: &RetryPolicy,
    attempt: u32,
    outcome: Outcome,
    reset_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Action {
    if outcome == Outcome::Completed {
        return Action::Return;
    }
    if attempt >= policy.max_retries {
        return Action::GiveUp;
    }

    match outcome {
        Outcome::RateLimited => {
            Action::WaitForReset(rate_limit_wait(reset_at, now, policy.rate_limit_ceiling))
        }
        Outcome::ServerError | Outcome::TransportFailure => Action::Backoff(policy.backoff(attempt)),
        Outcome::Completed => Action::Return,
    }
}

/// Time until the window resets, capped at `ceiling`. An unknown reset
/// waits the full ceiling; a reset in the past waits nothing.
pub fn rate_limit_wait(
    reset_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    ceiling: Duration,
) -> Duration {
    match reset_at {
        Some(reset_at) => (reset_at - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(ceiling),
        None => ceiling,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("max retries exceeded after {attempts} attempts (last status {status})")]
    Exhausted {
        attempts: u32,
        status: StatusCode,
        rate_limited: bool,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("request failed after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Runs a request through a transport with bounded retries.
pub struct RetryExecutor {
    policy: RetryPolicy,
    tracker: Arc<RateLimitTracker>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, tracker: Arc<RateLimitTracker>) -> Self {
        Self { policy, tracker }
    }

    pub async fn execute(
        &self,
        transport: &dyn Transport,
        request: &ApiRequest,
    ) -> Result<HttpResponse, ExecuteError> {
        let mut attempt = 0u32;

        loop {
            match transport.send(request).await {
                Ok(response) => {
                    self.tracker.observe(&response.headers).await;
                    let outcome = Outcome::classify(response.status, &response.headers);
                    // The shared tracker may already hold another quota window.
                    let reset_at = RateLimitState::from_headers(&response.headers)
                        .and_then(|state| state.reset_at);

                    match next_action(&self.policy, attempt, outcome, reset_at, Utc::now()) {
                        Action::Return => return Ok(response),
                        Action::GiveUp => {
                            tracing::warn!(
                                "Giving up on {} after {} attempts (status {})",
                                request.path,
                                attempt + 1,
                                response.status
                            );
                            return Err(ExecuteError::Exhausted {
                                attempts: attempt + 1,
                                status: response.status,
                                rate_limited: outcome == Outcome::RateLimited,
                                reset_at,
                            });
                        }
                        Action::WaitForReset(wait) => {
                            tracing::warn!("Rate limited. Waiting {}s...", wait.as_secs_f64().ceil());
                            tokio::time::sleep(wait).await;
                        }
                        Action::Backoff(wait) => {
                            tracing::warn!(
                                "Upstream returned {} for {}, retrying in {:?}",
                                response.status,
                                request.path,
                                wait
                            );
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
                Err(source) => {
                    match next_action(&self.policy, attempt, Outcome::TransportFailure, None, Utc::now()) {
                        Action::Backoff(wait) => {
                            tracing::warn!(
                                "Request to {} failed: {}, retrying in {:?}",
                                request.path,
                                source,
                                wait
                            );
                            tokio::time::sleep(wait).await;
                        }
                        _ => {
                            return Err(ExecuteError::Transport {
                                attempts: attempt + 1,
                                source,
                            })
                        }
                    }
                }
            }

            attempt += 1;
        }
    }
}

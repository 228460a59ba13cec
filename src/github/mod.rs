// src/github/mod.rs
//
// Access layer for the GitHub REST API: query construction, response
// caching, rate-limit tracking and retries around a pluggable transport.

pub mod cache;
pub mod client;
pub mod error;
pub mod normalize;
pub mod query;
pub mod rate_limit;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use client::{ClientCaches, GitHubClient, SearchResults};
pub use error::ApiError;
pub use rate_limit::RateLimitTracker;
pub use retry::RetryPolicy;
pub use transport::ReqwestTransport;

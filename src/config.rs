// src/config.rs
use anyhow::Context;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::github::cache::{DEFAULT_TTL, ISSUE_CACHE_CAPACITY, REPO_CACHE_CAPACITY};
use crate::github::retry::DEFAULT_MAX_RETRIES;
use crate::github::transport::GITHUB_API_BASE;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Server-held credential for upstream calls. Absent means
    /// unauthenticated access with the lower upstream quota.
    pub github_token: Option<SecretString>,
    pub github_api_base: String,
    /// When set, the client sends its requests through this proxy instead of
    /// calling the upstream API directly.
    pub github_proxy_url: Option<String>,
    pub jwt_secret: Option<SecretString>,
    pub cache_ttl: Duration,
    pub issue_cache_capacity: usize,
    pub repo_cache_capacity: usize,
    pub max_retries: u32,
    /// Requests per minute per client on the proxy route.
    pub proxy_rate_limit: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://repo_scout.db?mode=rwc".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 3000)?,
            github_token: secret_var("GITHUB_TOKEN"),
            github_api_base: std::env::var("GITHUB_API_BASE")
                .unwrap_or_else(|_| GITHUB_API_BASE.to_string()),
            github_proxy_url: optional_var("GITHUB_PROXY_URL"),
            jwt_secret: secret_var("JWT_SECRET"),
            cache_ttl: Duration::from_secs(parse_var("CACHE_TTL_SECS", DEFAULT_TTL.as_secs())?),
            issue_cache_capacity: parse_var("ISSUE_CACHE_CAPACITY", ISSUE_CACHE_CAPACITY)?,
            repo_cache_capacity: parse_var("REPO_CACHE_CAPACITY", REPO_CACHE_CAPACITY)?,
            max_retries: parse_var("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            proxy_rate_limit: parse_var("PROXY_RATE_LIMIT", 60)?,
        })
    }

    pub fn server_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid server address {}:{}", self.host, self.port))
    }

    /// Base URL the client sends its requests to.
    pub fn client_base_url(&self) -> &str {
        self.github_proxy_url
            .as_deref()
            .unwrap_or(&self.github_api_base)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            github_token: None,
            github_api_base: GITHUB_API_BASE.to_string(),
            github_proxy_url: None,
            jwt_secret: None,
            cache_ttl: DEFAULT_TTL,
            issue_cache_capacity: ISSUE_CACHE_CAPACITY,
            repo_cache_capacity: REPO_CACHE_CAPACITY,
            max_retries: DEFAULT_MAX_RETRIES,
            proxy_rate_limit: 60,
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secret_var(name: &str) -> Option<SecretString> {
    optional_var(name).map(SecretString::from)
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        None => Ok(default),
    }
}

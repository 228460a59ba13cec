// src/main.rs
mod auth;
mod config;
mod db;
mod error;
mod github;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::Database;
use crate::github::{ClientCaches, GitHubClient, RateLimitTracker, ReqwestTransport, RetryPolicy};
use crate::middleware::rate_limit::RateLimiter;
use crate::routes::create_router;
use crate::services::proxy::ProxyForwarder;

pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub github: GitHubClient,
    pub proxy: ProxyForwarder,
    pub proxy_limiter: Arc<RateLimiter>,
}

fn build_github_client(config: &Config) -> anyhow::Result<GitHubClient> {
    // The proxy attaches the credential itself.
    let token = match config.github_proxy_url {
        Some(_) => None,
        None => config.github_token.clone(),
    };

    let transport = ReqwestTransport::new(config.client_base_url(), token)
        .context("failed to build GitHub HTTP client")?;

    Ok(GitHubClient::new(
        Arc::new(transport),
        Arc::new(RateLimitTracker::new()),
        ClientCaches::new(
            config.cache_ttl,
            config.issue_cache_capacity,
            config.repo_cache_capacity,
        ),
        RetryPolicy::default().with_max_retries(config.max_retries),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repo_scout=info,tower_http=info")),
        )
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Repo Scout API...");

    let config = Config::from_env().context("failed to load configuration")?;

    if config.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set, GitHub requests will be unauthenticated and heavily rate limited");
    }
    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set, authenticated routes will reject every request");
    }

    tracing::info!("Connecting to database: {}", config.database_url);
    let db = Database::new(&config.database_url)
        .await
        .context("failed to connect to database")?;

    tracing::info!("Running database migrations...");
    db.migrate().await.context("failed to run migrations")?;

    let github = build_github_client(&config)?;
    tracing::info!("GitHub requests go to {}", config.client_base_url());

    let proxy = ProxyForwarder::new(&config.github_api_base, config.github_token.clone())
        .context("failed to build proxy forwarder")?;
    let proxy_limiter = Arc::new(RateLimiter::new(
        config.proxy_rate_limit,
        Duration::from_secs(60),
    ));

    let addr = config.server_addr()?;
    let state = Arc::new(AppState {
        db,
        config,
        github,
        proxy,
        proxy_limiter: proxy_limiter.clone(),
    });

    // Rate limiter cleanup task
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            proxy_limiter.cleanup().await;
            tracing::debug!("Rate limiter cleanup completed");
        }
    });

    let app = create_router(state.clone());

    tracing::info!("Repo Scout API listening on {}", addr);
    tracing::info!("Proxy: http://{}/api/github/", addr);
    if !state.proxy.has_token() {
        tracing::warn!("Proxy has no GitHub token to inject");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

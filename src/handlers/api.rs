// src/handlers/api.rs
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::github::rate_limit::RateLimitState;
use crate::models::HealthResponse;
use crate::AppState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Repo Scout API is running",
    })
}

/// Last observed upstream quota.
pub async fn rate_limit(State(state): State<Arc<AppState>>) -> Json<RateLimitState> {
    Json(state.github.rate_limit().await)
}

pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> StatusCode {
    tracing::info!("Cache cleared by user {}", user.id);
    state.github.clear_cache().await;
    StatusCode::NO_CONTENT
}

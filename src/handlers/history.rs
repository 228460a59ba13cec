// src/handlers/history.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{CreateHistoryRequest, IssueHistory};
use crate::AppState;

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<IssueHistory>>, AppError> {
    let history = state.db.list_issue_history(&user.id).await?;
    Ok(Json(history))
}

pub async fn create_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreateHistoryRequest>,
) -> Result<(StatusCode, Json<IssueHistory>), AppError> {
    payload.validate()?;

    let entry = state.db.create_issue_history(&user.id, &payload).await?;
    tracing::info!("User {} recorded solved issue {}", user.id, entry.id);

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.db.delete_issue_history(id, &user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

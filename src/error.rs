// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::github::ApiError;

/// Error type of the JSON handlers that call GitHub or the database.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("not found")]
    NotFound,
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Api(ApiError::RateLimited { reset_at }) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "GitHub API rate limit exceeded",
                    "resetAt": reset_at.map(|r| r.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
                }),
            ),
            AppError::Api(ApiError::RetriesExhausted { .. } | ApiError::Transport(_)) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "search failed, try again" }),
            ),
            AppError::Api(ApiError::Decode(_)) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "unexpected response from GitHub" }),
            ),
            AppError::Api(ApiError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": self.to_string() }),
            ),
            AppError::Api(ApiError::InvalidQuery { message }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message }),
            ),
            AppError::Api(ApiError::Client { status, message }) => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": message }),
            ),
            AppError::Api(ApiError::InvalidInput(message)) | AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message }),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
        };

        let transient = matches!(&self, AppError::Api(e) if e.is_transient());
        if transient || status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rate_limited_maps_to_429() {
        let (status, body) = render(AppError::Api(ApiError::RateLimited {
            reset_at: DateTime::from_timestamp(1_700_000_000, 0),
        }))
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["resetAt"], "2023-11-14T22:13:20.000Z");
    }

    #[tokio::test]
    async fn test_exhausted_maps_to_502() {
        let (status, body) = render(AppError::Api(ApiError::RetriesExhausted {
            attempts: 3,
            status: 503,
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "search failed, try again");
    }

    #[tokio::test]
    async fn test_client_errors_keep_upstream_status() {
        let (status, body) = render(AppError::Api(ApiError::Client {
            status: 404,
            message: "Not Found".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");

        let (status, _) = render(AppError::Api(ApiError::InvalidQuery {
            message: "Validation Failed".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

// src/handlers/proxy.rs
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method},
    response::Response,
};
use std::sync::Arc;

use crate::AppState;

pub async fn forward(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state
        .proxy
        .forward(method, &path, query.as_deref(), &headers, body)
        .await
}

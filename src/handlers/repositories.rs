// src/handlers/repositories.rs
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::github::normalize::{example_repositories, NormalizedRepository};
use crate::github::query::{Since, Sort};
use crate::github::{ApiError, SearchResults};
use crate::handlers::search::validate_common;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub language: Option<String>,
    #[serde(default)]
    pub since: Since,
}

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub language: Option<String>,
    pub min_stars: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TopicParams {
    pub sort: Option<Sort>,
}

pub async fn get_repository(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<NormalizedRepository>, AppError> {
    let repository = state.github.get_repository(&owner, &repo).await?;
    Ok(Json(repository))
}

/// Falls back to the built-in examples when the upstream call fails.
pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<SearchResults<NormalizedRepository>>, AppError> {
    validate_common(None, params.language.as_deref())?;

    let result = state.github.trending(params.language, params.since).await;
    Ok(Json(or_examples(result, "trending")))
}

pub async fn popular(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularParams>,
) -> Result<Json<SearchResults<NormalizedRepository>>, AppError> {
    validate_common(None, params.language.as_deref())?;

    let results = state
        .github
        .popular(params.language, params.min_stars)
        .await?;
    Ok(Json(results))
}

/// Falls back to the built-in examples when the upstream call fails.
pub async fn featured(
    State(state): State<Arc<AppState>>,
) -> Json<SearchResults<NormalizedRepository>> {
    let result = state.github.featured().await;
    Json(or_examples(result, "featured"))
}

pub async fn by_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(params): Query<TopicParams>,
) -> Result<Json<SearchResults<NormalizedRepository>>, AppError> {
    let results = state.github.by_topic(&topic, params.sort).await?;
    Ok(Json(results))
}

pub async fn by_owner(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Json<SearchResults<NormalizedRepository>>, AppError> {
    let results = state.github.by_owner(&owner).await?;
    Ok(Json(results))
}

fn or_examples(
    result: Result<SearchResults<NormalizedRepository>, ApiError>,
    what: &str,
) -> SearchResults<NormalizedRepository> {
    match result {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!("Loading {} repositories failed, serving examples: {}", what, e);
            let items = example_repositories();
            SearchResults {
                total_count: items.len() as u64,
                incomplete_results: false,
                items,
            }
        }
    }
}

// src/handlers/search.rs
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::github::normalize::{NormalizedIssue, NormalizedRepository};
use crate::github::query::{IssueSearch, Order, RepositorySearch, Sort};
use crate::github::SearchResults;
use crate::utils::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct IssueSearchParams {
    pub q: Option<String>,
    pub language: Option<String>,
    /// Comma-separated label names.
    pub labels: Option<String>,
    pub org: Option<String>,
    pub sort: Option<Sort>,
    pub order: Option<Order>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RepositorySearchParams {
    pub q: Option<String>,
    pub language: Option<String>,
    pub stars: Option<u32>,
    pub sort: Option<Sort>,
    pub order: Option<Order>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl IssueSearchParams {
    fn into_search(self) -> Result<IssueSearch, AppError> {
        let labels: Vec<String> = self
            .labels
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        for label in &labels {
            validation::validate_label(label).map_err(invalid)?;
        }
        if let Some(org) = self.org.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
            validation::validate_owner(org).map_err(invalid)?;
        }
        validate_common(self.q.as_deref(), self.language.as_deref())?;

        Ok(IssueSearch {
            free_text: self.q,
            language: self.language,
            labels,
            organization: self.org,
            sort: self.sort,
            order: self.order.unwrap_or_default(),
            page: self.page,
            per_page: self.per_page,
        })
    }
}

impl RepositorySearchParams {
    fn into_search(self) -> Result<RepositorySearch, AppError> {
        validate_common(self.q.as_deref(), self.language.as_deref())?;

        Ok(RepositorySearch {
            free_text: self.q,
            language: self.language,
            min_stars: self.stars,
            sort: self.sort,
            order: self.order.unwrap_or_default(),
            page: self.page,
            per_page: self.per_page,
            skip_recency: false,
        })
    }
}

pub async fn search_issues(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<IssueSearchParams>,
) -> Result<Json<SearchResults<NormalizedIssue>>, AppError> {
    let search = params.into_search()?;
    tracing::debug!("Issue search by {}", user.id);

    let results = state.github.search_issues(&search).await?;
    Ok(Json(results))
}

pub async fn search_repositories(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<RepositorySearchParams>,
) -> Result<Json<SearchResults<NormalizedRepository>>, AppError> {
    let search = params.into_search()?;
    tracing::debug!("Repository search by {}", user.id);

    let results = state.github.search_repositories(&search).await?;
    Ok(Json(results))
}

pub(crate) fn validate_common(q: Option<&str>, language: Option<&str>) -> Result<(), AppError> {
    if let Some(q) = q {
        validation::validate_free_text(q).map_err(invalid)?;
    }
    if let Some(language) = language.map(str::trim).filter(|l| !l.is_empty()) {
        validation::validate_language(language).map_err(invalid)?;
    }
    Ok(())
}

pub(crate) fn invalid(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

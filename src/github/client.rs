// src/github/client.rs
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::{ResponseCache, DEFAULT_TTL, ISSUE_CACHE_CAPACITY, REPO_CACHE_CAPACITY};
use super::error::ApiError;
use super::normalize::{
    normalize_issue, normalize_repository, parse_items, NormalizedIssue, NormalizedRepository,
    parse_repository, RawIssue, RawRepository, SearchEnvelope,
};
use super::query::{
    build_issue_query, build_repository_query, search_cache_key, IssueSearch, RepositorySearch,
    Since, Sort,
};
use super::rate_limit::{RateLimitState, RateLimitTracker};
use super::retry::{ExecuteError, RetryExecutor, RetryPolicy};
use super::transport::{ApiRequest, HttpResponse, Transport};
use crate::utils::validation;

const ISSUES_TAG: &str = "issues";
const REPOS_TAG: &str = "repos";
const REPO_TAG: &str = "repo";
const LOW_QUOTA_WARNING: u64 = 10;

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults<T> {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Vec<T>,
}

/// The three response caches. Each is shared so it can be cleared or
/// inspected from outside the client.
#[derive(Clone)]
pub struct ClientCaches {
    pub issues: Arc<ResponseCache<SearchResults<NormalizedIssue>>>,
    pub repo_searches: Arc<ResponseCache<SearchResults<NormalizedRepository>>>,
    pub repositories: Arc<ResponseCache<NormalizedRepository>>,
}

impl ClientCaches {
    pub fn new(ttl: Duration, issue_capacity: usize, repo_capacity: usize) -> Self {
        Self {
            issues: Arc::new(ResponseCache::new(issue_capacity, ttl)),
            repo_searches: Arc::new(ResponseCache::new(repo_capacity, ttl)),
            repositories: Arc::new(ResponseCache::new(issue_capacity, ttl)),
        }
    }
}

impl Default for ClientCaches {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, ISSUE_CACHE_CAPACITY, REPO_CACHE_CAPACITY)
    }
}

/// Entry point of the access layer: builds queries, consults the caches,
/// and runs requests through the retry executor.
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    executor: RetryExecutor,
    tracker: Arc<RateLimitTracker>,
    caches: ClientCaches,
}

impl GitHubClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tracker: Arc<RateLimitTracker>,
        caches: ClientCaches,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            executor: RetryExecutor::new(policy, tracker.clone()),
            tracker,
            caches,
        }
    }

    pub async fn search_issues(
        &self,
        params: &IssueSearch,
    ) -> Result<SearchResults<NormalizedIssue>, ApiError> {
        let query = build_issue_query(params);
        let pagination = params.pagination();
        let key = search_cache_key(ISSUES_TAG, &query, params.sort(), params.order, pagination);

        if let Some(cached) = self.caches.issues.get(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(cached);
        }
        debug!("Cache miss: {}", key);

        let request = ApiRequest::new("/search/issues")
            .param("q", &query)
            .param("sort", params.sort())
            .param("order", params.order)
            .param("per_page", pagination.per_page())
            .param("page", pagination.page());

        let envelope: SearchEnvelope = self.fetch_json(&request).await?;
        let language = params.language();
        let results = SearchResults {
            total_count: envelope.total_count,
            incomplete_results: envelope.incomplete_results,
            items: parse_items::<RawIssue>(envelope.items)
                .into_iter()
                .map(|raw| normalize_issue(raw, language))
                .collect(),
        };

        info!("Issue search \"{}\" returned {} items", query, results.items.len());
        self.caches.issues.put(key, results.clone()).await;
        Ok(results)
    }

    pub async fn search_repositories(
        &self,
        params: &RepositorySearch,
    ) -> Result<SearchResults<NormalizedRepository>, ApiError> {
        let query = build_repository_query(params);
        let pagination = params.pagination();
        let key = search_cache_key(REPOS_TAG, &query, params.sort(), params.order, pagination);

        if let Some(cached) = self.caches.repo_searches.get(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(cached);
        }
        debug!("Cache miss: {}", key);

        let request = ApiRequest::new("/search/repositories")
            .param("q", &query)
            .param("sort", params.sort())
            .param("order", params.order)
            .param("per_page", pagination.per_page())
            .param("page", pagination.page());

        let envelope: SearchEnvelope = self.fetch_json(&request).await?;
        let results = SearchResults {
            total_count: envelope.total_count,
            incomplete_results: envelope.incomplete_results,
            items: parse_items::<RawRepository>(envelope.items)
                .into_iter()
                .map(normalize_repository)
                .collect(),
        };

        info!("Repository search \"{}\" returned {} items", query, results.items.len());
        self.caches.repo_searches.put(key, results.clone()).await;
        Ok(results)
    }

    pub async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<NormalizedRepository, ApiError> {
        validation::validate_owner(owner).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        validation::validate_repo_name(repo).map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        // Owner and repository names are case-insensitive upstream.
        let key = format!("{}|{}/{}", REPO_TAG, owner.to_lowercase(), repo.to_lowercase());

        if let Some(cached) = self.caches.repositories.get(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(cached);
        }
        debug!("Cache miss: {}", key);

        let request = ApiRequest::new(format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        ));
        let body: serde_json::Value = self.fetch_json(&request).await?;
        let repository = normalize_repository(parse_repository(body)?);

        self.caches.repositories.put(key, repository.clone()).await;
        Ok(repository)
    }

    pub async fn trending(
        &self,
        language: Option<String>,
        since: Since,
    ) -> Result<SearchResults<NormalizedRepository>, ApiError> {
        let params = RepositorySearch::trending(language, since, Utc::now().date_naive());
        self.search_repositories(&params).await
    }

    pub async fn popular(
        &self,
        language: Option<String>,
        min_stars: Option<u32>,
    ) -> Result<SearchResults<NormalizedRepository>, ApiError> {
        self.search_repositories(&RepositorySearch::popular(language, min_stars))
            .await
    }

    pub async fn by_topic(
        &self,
        topic: &str,
        sort: Option<Sort>,
    ) -> Result<SearchResults<NormalizedRepository>, ApiError> {
        let topic = topic.trim().to_lowercase();
        validation::validate_topic(&topic).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        self.search_repositories(&RepositorySearch::by_topic(&topic, sort))
            .await
    }

    pub async fn by_owner(
        &self,
        owner: &str,
    ) -> Result<SearchResults<NormalizedRepository>, ApiError> {
        validation::validate_owner(owner).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        self.search_repositories(&RepositorySearch::by_owner(owner))
            .await
    }

    pub async fn featured(&self) -> Result<SearchResults<NormalizedRepository>, ApiError> {
        self.search_repositories(&RepositorySearch::featured()).await
    }

    pub async fn rate_limit(&self) -> RateLimitState {
        self.tracker.snapshot().await
    }

    pub async fn clear_cache(&self) {
        let dropped = self.caches.issues.len().await
            + self.caches.repo_searches.len().await
            + self.caches.repositories.len().await;

        self.caches.issues.clear().await;
        self.caches.repo_searches.clear().await;
        self.caches.repositories.clear().await;
        info!("Response caches cleared ({} entries)", dropped);
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self
            .executor
            .execute(self.transport.as_ref(), request)
            .await
            .map_err(ApiError::from)?;

        if let Some(remaining) = self.tracker.remaining().await {
            if remaining < LOW_QUOTA_WARNING {
                warn!("GitHub quota is running low: {} requests remaining", remaining);
            }
        }

        check_status(&response)?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

impl From<ExecuteError> for ApiError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::Exhausted {
                rate_limited: true,
                reset_at,
                ..
            } => ApiError::RateLimited { reset_at },
            ExecuteError::Exhausted {
                attempts, status, ..
            } => ApiError::RetriesExhausted {
                attempts,
                status: status.as_u16(),
            },
            ExecuteError::Transport { source, .. } => ApiError::Transport(source),
        }
    }
}

/// Map a non-retryable, non-success response onto an error, carrying the
/// upstream `message` when the body has one.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    let status = response.status;
    if status.is_success() {
        return Ok(());
    }

    debug!("Upstream returned {}: {}", status, response.body_text());

    let message = upstream_message(response)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(match status.as_u16() {
        401 => ApiError::Unauthorized,
        422 => ApiError::InvalidQuery { message },
        code => ApiError::Client {
            status: code,
            message,
        },
    })
}

fn upstream_message(response: &HttpResponse) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.is_empty())
}

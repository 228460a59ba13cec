// src/github/query.rs
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_PER_PAGE: u32 = 30;
pub const DEFAULT_MIN_STARS: u32 = 10;
pub const DEFAULT_POPULAR_MIN_STARS: u32 = 1000;
/// How far back the recency clause reaches when a repository search has
/// neither free text nor a language.
pub const RECENCY_WINDOW_DAYS: i64 = 365;

const ISSUE_BASE_SCOPE: &str = "is:issue is:open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Updated,
    Stars,
    Created,
    Forks,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Updated => "updated",
            Sort::Stars => "stars",
            Sort::Created => "created",
            Sort::Forks => "forks",
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trending window for [`RepositorySearch::trending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Since {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Since {
    fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Since::Daily => today - Duration::days(1),
            Since::Weekly => today - Duration::days(7),
            Since::Monthly => today
                .checked_sub_months(chrono::Months::new(1))
                .unwrap_or(today - Duration::days(30)),
        }
    }
}

/// Page number and size. `per_page` is clamped to `1..=30` and `page` to at
/// least 1, so two requests that differ only by out-of-range values resolve
/// to the same page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(MAX_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Parameters of an issue search.
#[derive(Debug, Clone, Default)]
pub struct IssueSearch {
    pub free_text: Option<String>,
    pub language: Option<String>,
    pub labels: Vec<String>,
    pub organization: Option<String>,
    pub sort: Option<Sort>,
    pub order: Order,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl IssueSearch {
    pub fn language(&self) -> Option<&str> {
        non_empty(&self.language)
    }

    pub fn sort(&self) -> Sort {
        self.sort.unwrap_or(Sort::Created)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

/// Parameters of a repository search.
#[derive(Debug, Clone, Default)]
pub struct RepositorySearch {
    pub free_text: Option<String>,
    pub language: Option<String>,
    pub min_stars: Option<u32>,
    pub sort: Option<Sort>,
    pub order: Order,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Leave out the `pushed:>` clause even without text or language.
    pub skip_recency: bool,
}

impl RepositorySearch {
    pub fn sort(&self) -> Sort {
        self.sort.unwrap_or(Sort::Updated)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }

    /// Recently created repositories ranked by stars.
    pub fn trending(language: Option<String>, since: Since, today: NaiveDate) -> Self {
        Self {
            free_text: Some(format!("created:>{}", since.cutoff(today).format("%Y-%m-%d"))),
            language,
            min_stars: Some(DEFAULT_MIN_STARS),
            sort: Some(Sort::Stars),
            ..Self::default()
        }
    }

    /// Most-starred repositories of any age.
    pub fn popular(language: Option<String>, min_stars: Option<u32>) -> Self {
        Self {
            language,
            min_stars: Some(min_stars.unwrap_or(DEFAULT_POPULAR_MIN_STARS)),
            sort: Some(Sort::Stars),
            skip_recency: true,
            ..Self::default()
        }
    }

    pub fn by_topic(topic: &str, sort: Option<Sort>) -> Self {
        Self {
            free_text: Some(format!("topic:{}", topic.trim())),
            sort: Some(sort.unwrap_or(Sort::Stars)),
            ..Self::default()
        }
    }

    pub fn by_owner(owner: &str) -> Self {
        Self {
            free_text: Some(format!("user:{}", owner.trim())),
            sort: Some(Sort::Updated),
            ..Self::default()
        }
    }

    /// The curated set shown on first load.
    pub fn featured() -> Self {
        Self {
            free_text: Some("topic:ycombinator".to_string()),
            min_stars: Some(DEFAULT_MIN_STARS),
            sort: Some(Sort::Stars),
            ..Self::default()
        }
    }
}

/// Build the search string for `/search/issues`.
///
/// Clause order is fixed: base scope, organization, language, labels, free
/// text.
pub fn build_issue_query(params: &IssueSearch) -> String {
    let mut clauses = vec![ISSUE_BASE_SCOPE.to_string()];

    if let Some(org) = non_empty(&params.organization) {
        clauses.push(format!("org:{}", org));
    }
    if let Some(language) = non_empty(&params.language) {
        clauses.push(format!("language:{}", language));
    }
    for label in dedup_labels(&params.labels) {
        clauses.push(format!("label:\"{}\"", label));
    }
    if let Some(text) = non_empty(&params.free_text) {
        clauses.push(text.to_string());
    }

    clauses.join(" ")
}

/// Build the search string for `/search/repositories` using today's date
/// for the recency clause.
pub fn build_repository_query(params: &RepositorySearch) -> String {
    build_repository_query_at(params, Utc::now().date_naive())
}

pub fn build_repository_query_at(params: &RepositorySearch, today: NaiveDate) -> String {
    let mut clauses = Vec::new();

    let text = non_empty(&params.free_text);
    let language = non_empty(&params.language);

    if let Some(text) = text {
        clauses.push(text.to_string());
    }
    if let Some(language) = language {
        clauses.push(format!("language:{}", language));
    }
    clauses.push(format!(
        "stars:>{}",
        params.min_stars.unwrap_or(DEFAULT_MIN_STARS)
    ));

    // Without any discriminating filter the top-starred results are mostly
    // abandoned projects.
    if text.is_none() && language.is_none() && !params.skip_recency {
        let cutoff = today - Duration::days(RECENCY_WINDOW_DAYS);
        clauses.push(format!("pushed:>{}", cutoff.format("%Y-%m-%d")));
    }

    clauses.join(" ")
}

/// Cache key for a search: operation tag, resolved query, sort, order and
/// pagination. Only the query can contain the separator, and it is followed
/// by fields that never do, so distinct inputs never produce the same key.
pub fn search_cache_key(
    tag: &str,
    query: &str,
    sort: Sort,
    order: Order,
    pagination: Pagination,
) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        tag,
        query,
        sort,
        order,
        pagination.per_page(),
        pagination.page()
    )
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn dedup_labels(labels: &[String]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for label in labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if !seen.contains(&label) {
            seen.push(label);
        }
    }
    seen
}

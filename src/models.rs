// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const UNKNOWN_REPOSITORY: &str = "Unknown Repository";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Merged,
    Closed,
}

// Database models
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueHistoryRow {
    pub id: i64,
    pub user_id: String,
    pub issue_title: String,
    pub issue_url: String,
    pub pr_url: String,
    pub pr_status: PrStatus,
    pub solved_at: DateTime<Utc>,
    pub repository: Option<String>,
    /// JSON array of label names.
    pub labels: Option<String>,
}

/// A solved issue in a user's contribution history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueHistory {
    pub id: i64,
    pub user_id: String,
    pub issue_title: String,
    pub issue_url: String,
    pub pr_url: String,
    pub pr_status: PrStatus,
    pub solved_at: DateTime<Utc>,
    pub repository: String,
    pub labels: Vec<String>,
}

impl From<IssueHistoryRow> for IssueHistory {
    fn from(row: IssueHistoryRow) -> Self {
        let labels = row
            .labels
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        Self {
            id: row.id,
            user_id: row.user_id,
            issue_title: row.issue_title,
            issue_url: row.issue_url,
            pr_url: row.pr_url,
            pr_status: row.pr_status,
            solved_at: row.solved_at,
            repository: row
                .repository
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_REPOSITORY.to_string()),
            labels,
        }
    }
}

// Request/Response types
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoryRequest {
    #[validate(length(min = 1, max = 300))]
    pub issue_title: String,
    #[validate(url)]
    pub issue_url: String,
    #[validate(url)]
    pub pr_url: String,
    pub pr_status: PrStatus,
    /// Defaults to the time of the request.
    pub solved_at: Option<DateTime<Utc>>,
    #[validate(length(max = 200))]
    pub repository: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> IssueHistoryRow {
        IssueHistoryRow {
            id: 1,
            user_id: "user-1".to_string(),
            issue_title: "Fix panic on empty input".to_string(),
            issue_url: "https://github.com/acme/tool/issues/3".to_string(),
            pr_url: "https://github.com/acme/tool/pull/4".to_string(),
            pr_status: PrStatus::Merged,
            solved_at: Utc::now(),
            repository: None,
            labels: None,
        }
    }

    #[test]
    fn test_history_defaults() {
        let history = IssueHistory::from(row());
        assert_eq!(history.repository, UNKNOWN_REPOSITORY);
        assert!(history.labels.is_empty());
    }

    #[test]
    fn test_history_labels_decoded() {
        let history = IssueHistory::from(IssueHistoryRow {
            repository: Some("acme/tool".to_string()),
            labels: Some(r#"["bug","good first issue"]"#.to_string()),
            ..row()
        });
        assert_eq!(history.repository, "acme/tool");
        assert_eq!(history.labels, vec!["bug", "good first issue"]);
    }

    #[test]
    fn test_create_request_validation() {
        let request: CreateHistoryRequest = serde_json::from_value(serde_json::json!({
            "issueTitle": "Fix panic",
            "issueUrl": "https://github.com/acme/tool/issues/3",
            "prUrl": "https://github.com/acme/tool/pull/4",
            "prStatus": "open"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert!(request.labels.is_empty());

        let invalid = CreateHistoryRequest {
            issue_title: String::new(),
            pr_url: "not a url".to_string(),
            ..request
        };
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("issue_title"));
        assert!(fields.contains_key("pr_url"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result: Result<CreateHistoryRequest, _> = serde_json::from_value(serde_json::json!({
            "issueTitle": "x",
            "issueUrl": "https://github.com/a/b/issues/1",
            "prUrl": "https://github.com/a/b/pull/2",
            "prStatus": "draft"
        }));
        assert!(result.is_err());
    }
}

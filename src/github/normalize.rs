// src/github/normalize.rs
//
// Upstream payloads are parsed into the `Raw*` structs below, where every
// field is optional, then mapped onto the records the application serves.
// Only a payload that is not a JSON object is rejected.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const REPOS_URL_PREFIX: &str = "https://api.github.com/repos/";
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLabel {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawUser {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawIssue {
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub repository_url: Option<String>,
    pub labels: Option<Vec<RawLabel>>,
    pub user: Option<RawUser>,
    pub created_at: Option<String>,
    pub comments: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLicense {
    pub name: Option<String>,
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRepository {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub watchers_count: Option<u64>,
    pub open_issues_count: Option<u64>,
    pub subscribers_count: Option<u64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
    pub size: Option<u64>,
    pub private: Option<bool>,
    pub default_branch: Option<String>,
    pub homepage: Option<String>,
    pub html_url: Option<String>,
    pub owner: Option<RawUser>,
    pub topics: Option<Vec<String>>,
    pub license: Option<RawLicense>,
}

/// Envelope shared by both search endpoints. Items are kept as raw JSON so a
/// single malformed item cannot fail the whole page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchEnvelope {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedIssue {
    pub title: String,
    pub url: String,
    pub repository_full_name: String,
    pub labels: Vec<String>,
    pub language: String,
    pub author: String,
    pub created_at: String,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryOwner {
    pub login: String,
    pub avatar_url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryLicense {
    pub name: String,
    pub spdx_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub star_count: u64,
    pub fork_count: u64,
    pub watcher_count: u64,
    pub open_issue_count: u64,
    pub subscriber_count: u64,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: Option<String>,
    pub size: u64,
    pub is_private: bool,
    pub default_branch: String,
    pub homepage: Option<String>,
    pub html_url: String,
    pub owner: RepositoryOwner,
    pub topics: Vec<String>,
    pub license: Option<RepositoryLicense>,
}

/// `language` is the language filter of the search that produced the issue;
/// the search endpoint has no per-issue language.
pub fn normalize_issue(raw: RawIssue, language: Option<&str>) -> NormalizedIssue {
    let repository_url = raw.repository_url.unwrap_or_default();

    NormalizedIssue {
        title: raw.title.unwrap_or_default(),
        url: raw.html_url.unwrap_or_default(),
        repository_full_name: repository_full_name(&repository_url),
        labels: raw
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|label| label.name)
            .collect(),
        language: language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(UNKNOWN_LANGUAGE)
            .to_string(),
        author: raw.user.and_then(|u| u.login).unwrap_or_default(),
        created_at: raw.created_at.unwrap_or_default(),
        comment_count: raw.comments.unwrap_or(0),
    }
}

pub fn normalize_repository(raw: RawRepository) -> NormalizedRepository {
    let owner = raw.owner.unwrap_or_default();
    let name = raw.name.unwrap_or_default();

    NormalizedRepository {
        id: raw.id.unwrap_or(0),
        full_name: raw.full_name.unwrap_or_else(|| match &owner.login {
            Some(login) => format!("{}/{}", login, name),
            None => name.clone(),
        }),
        name,
        description: raw.description,
        language: raw.language,
        star_count: raw.stargazers_count.unwrap_or(0),
        fork_count: raw.forks_count.unwrap_or(0),
        watcher_count: raw.watchers_count.unwrap_or(0),
        open_issue_count: raw.open_issues_count.unwrap_or(0),
        subscriber_count: raw.subscribers_count.unwrap_or(0),
        created_at: raw.created_at.unwrap_or_default(),
        updated_at: raw.updated_at.unwrap_or_default(),
        pushed_at: raw.pushed_at,
        size: raw.size.unwrap_or(0),
        is_private: raw.private.unwrap_or(false),
        default_branch: raw.default_branch.unwrap_or_else(|| "main".to_string()),
        homepage: raw.homepage.filter(|h| !h.is_empty()),
        html_url: raw.html_url.unwrap_or_default(),
        owner: RepositoryOwner {
            login: owner.login.unwrap_or_default(),
            avatar_url: owner.avatar_url.unwrap_or_default(),
            kind: owner.kind.unwrap_or_else(|| "User".to_string()),
        },
        topics: raw.topics.unwrap_or_default(),
        license: raw.license.map(|l| RepositoryLicense {
            name: l.name.unwrap_or_default(),
            spdx_id: l.spdx_id.unwrap_or_default(),
        }),
    }
}

/// `owner/repo` from an API repository URL. An unexpected shape is returned
/// unchanged.
pub fn repository_full_name(repository_url: &str) -> String {
    repository_url
        .strip_prefix(REPOS_URL_PREFIX)
        .unwrap_or(repository_url)
        .to_string()
}

/// Parse each search item on its own. Items that do not fit the raw schema
/// at all (wrong JSON types) are skipped.
pub fn parse_items<T: DeserializeOwned>(items: Vec<serde_json::Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!("Skipping malformed search item {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// Parse a single repository payload. A field with an unexpected type is
/// dropped and falls back to its default; only a body that is not an object
/// fails.
pub fn parse_repository(value: Value) -> Result<RawRepository, serde_json::Error> {
    let fields = match value {
        Value::Object(fields) => fields,
        other => return serde_json::from_value(other),
    };

    let kept: Map<String, Value> = fields
        .into_iter()
        .filter(|(name, value)| {
            let mut single = Map::new();
            single.insert(name.clone(), value.clone());
            let usable = serde_json::from_value::<RawRepository>(Value::Object(single)).is_ok();
            if !usable {
                tracing::warn!("Ignoring repository field {} with unexpected type", name);
            }
            usable
        })
        .collect();

    serde_json::from_value(Value::Object(kept))
}

/// Built-in repositories served when trending or featured loads fail.
pub fn example_repositories() -> Vec<NormalizedRepository> {
    vec![
        example(
            1,
            ("facebook", 69631, "react"),
            "A declarative, efficient, and flexible JavaScript library for building user interfaces.",
            "JavaScript",
            (225_000, 46_000, 6_700, 800, 7_500),
            ("2013-05-24T16:41:05Z", "2024-01-15T20:30:00Z", "2024-01-15T18:45:00Z"),
            150_000,
            &["react", "javascript", "frontend", "ui", "library"],
            Some(("MIT", "MIT")),
        ),
        example(
            2,
            ("microsoft", 6154722, "vscode"),
            "Visual Studio Code - a lightweight but powerful source code editor.",
            "TypeScript",
            (159_000, 29_000, 5_400, 6_500, 12_000),
            ("2015-09-03T15:54:08Z", "2024-01-15T22:15:00Z", "2024-01-15T21:30:00Z"),
            800_000,
            &["vscode", "editor", "typescript", "electron", "development"],
            None,
        ),
        example(
            3,
            ("tensorflow", 15658638, "tensorflow"),
            "An Open Source Machine Learning Framework for Everyone.",
            "C++",
            (185_000, 75_000, 9_800, 3_500, 5_500),
            ("2015-11-09T01:22:21Z", "2024-01-15T19:45:00Z", "2024-01-15T17:20:00Z"),
            650_000,
            &["tensorflow", "machine-learning", "deep-learning", "ai", "python"],
            Some(("Apache 2.0", "Apache-2.0")),
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn example(
    id: u64,
    (owner, owner_id, name): (&str, u64, &str),
    description: &str,
    language: &str,
    (stars, forks, watchers, open_issues, subscribers): (u64, u64, u64, u64, u64),
    (created_at, updated_at, pushed_at): (&str, &str, &str),
    size: u64,
    topics: &[&str],
    license: Option<(&str, &str)>,
) -> NormalizedRepository {
    NormalizedRepository {
        id,
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        description: Some(description.to_string()),
        language: Some(language.to_string()),
        star_count: stars,
        fork_count: forks,
        watcher_count: watchers,
        open_issue_count: open_issues,
        subscriber_count: subscribers,
        created_at: created_at.to_string(),
        updated_at: updated_at.to_string(),
        pushed_at: Some(pushed_at.to_string()),
        size,
        is_private: false,
        default_branch: if owner == "tensorflow" { "master" } else { "main" }.to_string(),
        homepage: None,
        html_url: format!("https://github.com/{}/{}", owner, name),
        owner: RepositoryOwner {
            login: owner.to_string(),
            avatar_url: format!("https://avatars.githubusercontent.com/u/{}?v=4", owner_id),
            kind: "Organization".to_string(),
        },
        topics: topics.iter().map(|t| t.to_string()).collect(),
        license: license.map(|(name, spdx_id)| RepositoryLicense {
            name: name.to_string(),
            spdx_id: spdx_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_issue() {
        let raw: RawIssue = serde_json::from_value(json!({
            "title": "Add dark mode",
            "html_url": "https://github.com/acme/widgets/issues/7",
            "repository_url": "https://api.github.com/repos/acme/widgets",
            "labels": [
                {"name": "good first issue", "color": "7057ff"},
                {"name": "ui", "color": "ffffff"}
            ],
            "user": {"login": "octocat"},
            "created_at": "2024-05-01T10:00:00Z",
            "comments": 3,
            "state": "open"
        }))
        .unwrap();

        let issue = normalize_issue(raw, Some("Python"));
        assert_eq!(issue.title, "Add dark mode");
        assert_eq!(issue.repository_full_name, "acme/widgets");
        assert_eq!(issue.labels, vec!["good first issue", "ui"]);
        assert_eq!(issue.language, "Python");
        assert_eq!(issue.author, "octocat");
        assert_eq!(issue.comment_count, 3);
    }

    #[test]
    fn test_issue_language_defaults_to_unknown() {
        let issue = normalize_issue(RawIssue::default(), None);
        assert_eq!(issue.language, UNKNOWN_LANGUAGE);
        assert!(issue.labels.is_empty());
        assert_eq!(issue.comment_count, 0);
    }

    #[test]
    fn test_repository_full_name_fallback() {
        assert_eq!(
            repository_full_name("https://api.github.com/repos/rust-lang/rust"),
            "rust-lang/rust"
        );
        assert_eq!(
            repository_full_name("https://ghe.example.com/api/v3/repos/a/b"),
            "https://ghe.example.com/api/v3/repos/a/b"
        );
    }

    #[test]
    fn test_repository_missing_topics_and_license() {
        let raw: RawRepository = serde_json::from_value(json!({
            "id": 1296269,
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "stargazers_count": 80,
            "owner": {"login": "octocat", "avatar_url": "https://a/u/1", "type": "User"}
        }))
        .unwrap();

        let repo = normalize_repository(raw);
        assert!(repo.topics.is_empty());
        assert!(repo.license.is_none());
        assert_eq!(repo.star_count, 80);
        assert_eq!(repo.owner.login, "octocat");
    }

    #[test]
    fn test_repository_nulls_are_tolerated() {
        let raw: RawRepository = serde_json::from_value(json!({
            "name": "thing",
            "description": null,
            "language": null,
            "homepage": "",
            "license": null,
            "topics": null,
            "owner": {"login": "someone"}
        }))
        .unwrap();

        let repo = normalize_repository(raw);
        assert_eq!(repo.full_name, "someone/thing");
        assert_eq!(repo.description, None);
        assert_eq!(repo.homepage, None);
        assert_eq!(repo.owner.kind, "User");
    }

    #[test]
    fn test_parse_items_skips_malformed() {
        let items = vec![
            json!({"title": "ok"}),
            json!({"title": 42}),
            json!("not an object"),
            json!({"title": "also ok", "comments": 1}),
        ];
        let parsed: Vec<RawIssue> = parse_items(items);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].title.as_deref(), Some("also ok"));
    }

    #[test]
    fn test_parse_repository_defaults_mistyped_fields() {
        let raw = parse_repository(json!({
            "name": "rust",
            "full_name": "rust-lang/rust",
            "size": "big",
            "stargazers_count": 90000,
            "topics": "compiler",
            "owner": {"login": "rust-lang"}
        }))
        .unwrap();

        assert_eq!(raw.size, None);
        assert_eq!(raw.topics, None);
        assert_eq!(raw.stargazers_count, Some(90000));
        assert_eq!(normalize_repository(raw).full_name, "rust-lang/rust");

        assert!(parse_repository(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_example_repositories() {
        let repos = example_repositories();
        assert_eq!(repos.len(), 3);
        assert_eq!(repos[0].full_name, "facebook/react");
        assert!(repos[1].license.is_none());
        assert_eq!(repos[2].default_branch, "master");
    }
}

// src/db.rs
use crate::models::*;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every connection to an in-memory database gets its own copy.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    // Issue history operations
    pub async fn list_issue_history(&self, user_id: &str) -> Result<Vec<IssueHistory>, sqlx::Error> {
        let rows = sqlx::query_as::<_, IssueHistoryRow>(
            "SELECT id, user_id, issue_title, issue_url, pr_url, pr_status, solved_at, repository, labels
             FROM issue_history
             WHERE user_id = ?
             ORDER BY solved_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IssueHistory::from).collect())
    }

    pub async fn create_issue_history(
        &self,
        user_id: &str,
        entry: &CreateHistoryRequest,
    ) -> Result<IssueHistory, sqlx::Error> {
        let labels = serde_json::to_string(&entry.labels)
            .map_err(|e| sqlx::Error::Protocol(format!("failed to encode labels: {}", e)))?;
        let solved_at = entry.solved_at.unwrap_or_else(Utc::now);

        let result = sqlx::query(
            "INSERT INTO issue_history
                (user_id, issue_title, issue_url, pr_url, pr_status, solved_at, repository, labels)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&entry.issue_title)
        .bind(&entry.issue_url)
        .bind(&entry.pr_url)
        .bind(entry.pr_status)
        .bind(solved_at)
        .bind(&entry.repository)
        .bind(labels)
        .execute(&self.pool)
        .await?;

        self.get_issue_history(result.last_insert_rowid(), user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_issue_history(
        &self,
        id: i64,
        user_id: &str,
    ) -> Result<Option<IssueHistory>, sqlx::Error> {
        let row = sqlx::query_as::<_, IssueHistoryRow>(
            "SELECT id, user_id, issue_title, issue_url, pr_url, pr_status, solved_at, repository, labels
             FROM issue_history
             WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IssueHistory::from))
    }

    /// Returns false when no entry with that id belongs to the user.
    pub async fn delete_issue_history(&self, id: i64, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM issue_history WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub async fn test_database() -> Database {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    db
}

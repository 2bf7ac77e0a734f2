//! Metadata storage using SQLite
//!
//! This module handles all local relational storage including:
//! - Users and chats
//! - Messages (conversation turns)
//! - Long-term memory records
//! - Document permissions and access accounting
//! - Build runs (index rebuild history)

mod schema;

pub use schema::*;

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Build run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(Error::Config(format!("Unknown run status: {}", s))),
        }
    }
}

/// A chat participant
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

/// One conversation thread
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: String,
}

/// One conversation turn; `sender` false = user, true = assistant
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: i64,
    pub body: String,
    pub sender: bool,
    pub created_at: String,
}

/// One long-term memory record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub user_id: i64,
    pub info: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An index rebuild record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BuildRun {
    pub id: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub docs_processed: i64,
    pub points_written: i64,
    pub errors_json: Option<String>,
}

impl BuildRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            completed_at: None,
            status: RunStatus::Running.to_string(),
            docs_processed: 0,
            points_written: 0,
            errors_json: None,
        }
    }
}

impl Default for BuildRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the metadata database, creating the file if needed
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if the database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='users'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== User Operations =====

    /// Insert or update a user profile
    pub async fn upsert_user(&self, id: i64, name: &str, description: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, description, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get user by id
    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // ===== Chat Operations =====

    /// Create a new chat for a user
    pub async fn create_chat(&self, user_id: i64, name: &str) -> Result<Chat> {
        let created_at = Utc::now().to_rfc3339();
        let result = sqlx::query("INSERT INTO chats (user_id, name, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(name)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;

        Ok(Chat {
            id: result.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            created_at,
        })
    }

    /// Get chat by id
    pub async fn get_chat(&self, id: i64) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    // ===== Message Operations =====

    /// Append a message to a chat; returns its id
    pub async fn insert_message(&self, chat_id: i64, body: &str, sender: bool) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO messages (chat_id, body, sender, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(chat_id)
        .bind(body)
        .bind(sender)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Last `limit` messages of a chat, oldest first
    pub async fn recent_messages(&self, chat_id: i64, limit: usize) -> Result<Vec<StoredMessage>> {
        let mut messages = sqlx::query_as::<_, StoredMessage>(
            "SELECT * FROM messages WHERE chat_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(chat_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    // ===== Memory Operations =====

    /// All memory records for a user in ascending id order
    pub async fn list_memory(&self, user_id: i64) -> Result<Vec<MemoryRecord>> {
        let records = sqlx::query_as::<_, MemoryRecord>(
            "SELECT * FROM llm_memory WHERE user_id = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Insert a new memory record; returns its id
    pub async fn insert_memory(&self, user_id: i64, info: &str) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO llm_memory (user_id, info, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(info)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Replace the text of an existing memory record
    pub async fn update_memory_info(&self, id: i64, info: &str) -> Result<()> {
        sqlx::query("UPDATE llm_memory SET info = ?, updated_at = ? WHERE id = ?")
            .bind(info)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a memory record
    pub async fn delete_memory(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM llm_memory WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Total number of memory records across all users
    pub async fn count_memory_records(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM llm_memory")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ===== Permission Operations =====

    /// Grant a user access to a document
    pub async fn grant_permission(&self, user_id: i64, doc_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO doc_permissions (user_id, doc_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(doc_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The set of document ids a user may access
    pub async fn permitted_doc_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT doc_id FROM doc_permissions WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().collect())
    }

    // ===== Doc Call Operations =====

    /// Count one retrieval of a document on behalf of a user
    pub async fn record_doc_call(&self, user_id: i64, doc_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO doc_calls (user_id, doc_id, call_count) VALUES (?, ?, 1)
            ON CONFLICT(user_id, doc_id) DO UPDATE SET call_count = call_count + 1
            "#,
        )
        .bind(user_id)
        .bind(doc_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Current call count for a (user, document) pair
    pub async fn doc_call_count(&self, user_id: i64, doc_id: i64) -> Result<i64> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT call_count FROM doc_calls WHERE user_id = ? AND doc_id = ?",
        )
        .bind(user_id)
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    // ===== Build Run Operations =====

    /// Insert a new build run
    pub async fn insert_build_run(&self, run: &BuildRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO build_runs (id, started_at, completed_at, status, docs_processed, points_written, errors_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(&run.started_at)
        .bind(&run.completed_at)
        .bind(&run.status)
        .bind(run.docs_processed)
        .bind(run.points_written)
        .bind(&run.errors_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a build run finished with its final stats
    pub async fn finish_build_run(
        &self,
        id: &str,
        status: RunStatus,
        docs_processed: i64,
        points_written: i64,
        errors_json: Option<String>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE build_runs
            SET completed_at = ?, status = ?, docs_processed = ?, points_written = ?, errors_json = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(status.to_string())
        .bind(docs_processed)
        .bind(points_written)
        .bind(errors_json)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent build run, if any
    pub async fn latest_build_run(&self) -> Result<Option<BuildRun>> {
        let run = sqlx::query_as::<_, BuildRun>(
            "SELECT * FROM build_runs ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_db() -> (TempDir, MetaDb) {
        let dir = TempDir::new().unwrap();
        let db = MetaDb::connect(&dir.path().join("test.db")).await.unwrap();
        db.init_schema().await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let (_dir, db) = test_db().await;
        db.init_schema().await.unwrap();
        assert!(db.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_messages_oldest_first() {
        let (_dir, db) = test_db().await;
        db.upsert_user(1, "ada", None).await.unwrap();
        let chat = db.create_chat(1, "test chat").await.unwrap();

        for i in 0..5 {
            db.insert_message(chat.id, &format!("message {i}"), i % 2 == 1)
                .await
                .unwrap();
        }

        let recent = db.recent_messages(chat.id, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].body, "message 2");
        assert_eq!(recent[2].body, "message 4");
        assert!(recent[1].sender);
        assert!(!recent[2].sender);
    }

    #[tokio::test]
    async fn test_permissions_and_doc_calls() {
        let (_dir, db) = test_db().await;
        db.grant_permission(1, 10).await.unwrap();
        db.grant_permission(1, 10).await.unwrap();

        let permitted = db.permitted_doc_ids(1).await.unwrap();
        assert!(permitted.contains(&10));
        assert_eq!(permitted.len(), 1);

        db.record_doc_call(1, 10).await.unwrap();
        db.record_doc_call(1, 10).await.unwrap();
        assert_eq!(db.doc_call_count(1, 10).await.unwrap(), 2);
        assert_eq!(db.doc_call_count(1, 99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_build_run_lifecycle() {
        let (_dir, db) = test_db().await;
        let run = BuildRun::new();
        db.insert_build_run(&run).await.unwrap();

        db.finish_build_run(&run.id, RunStatus::Completed, 4, 12, None)
            .await
            .unwrap();

        let latest = db.latest_build_run().await.unwrap().unwrap();
        assert_eq!(latest.id, run.id);
        assert_eq!(latest.status, "completed");
        assert_eq!(latest.docs_processed, 4);
        assert!(latest.completed_at.is_some());
    }
}

//! Snapshot storage repository.
//!
//! Every public operation fails soft: storage and decoding problems are
//! logged and reported as a cache miss (reads) or ignored (writes).

use std::path::Path;

use chrono::{DateTime, Utc};
use civichat_api::{ContactId, GroupId, GroupMessage, GroupSummary};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, warn};

use super::model::{CacheRecord, GROUPS_PREFIX, MESSAGES_PREFIX, SnapshotKey};
use crate::Result;

/// Repository for snapshot storage and retrieval.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: SqlitePool,
}

impl SnapshotRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Open the repository at `path`, creating parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::new(&path.to_string_lossy()).await
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        // A single connection that never expires, so the database outlives idle periods.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS snapshots (
                scope TEXT PRIMARY KEY NOT NULL,
                payload TEXT NOT NULL,
                captured_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the underlying pool. Later operations behave as storage failures.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Read the snapshot stored under `key`.
    ///
    /// Returns `None` on a miss and on any storage or decoding failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &SnapshotKey) -> Option<CacheRecord<T>> {
        match self.try_get(key).await {
            Ok(Some(record)) => {
                debug!("Snapshot hit for {key}");
                Some(record)
            }
            Ok(None) => {
                debug!("Snapshot miss for {key}");
                None
            }
            Err(e) => {
                warn!("Unable to read offline cache for key {key}: {e}");
                None
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, key: &SnapshotKey) -> Result<Option<CacheRecord<T>>> {
        let row = sqlx::query(r"SELECT payload, captured_at FROM snapshots WHERE scope = ?")
            .bind(key.scope())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload")?;
        let captured_at: String = row.try_get("captured_at")?;

        let Ok(captured_at) = DateTime::parse_from_rfc3339(&captured_at) else {
            warn!("Discarding snapshot {key} with unreadable capture time");
            return Ok(None);
        };

        Ok(Some(CacheRecord {
            payload: serde_json::from_str(&payload)?,
            captured_at: captured_at.with_timezone(&Utc),
        }))
    }

    /// Replace the snapshot stored under `key`.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn set<T: Serialize + Sync>(&self, key: &SnapshotKey, payload: &T) {
        if let Err(e) = self.try_set(key, payload).await {
            warn!("Unable to persist offline cache for key {key}: {e}");
        }
    }

    async fn try_set<T: Serialize + Sync>(&self, key: &SnapshotKey, payload: &T) -> Result<()> {
        let payload = serde_json::to_string(payload)?;

        sqlx::query(
            r"
            INSERT INTO snapshots (scope, payload, captured_at)
            VALUES (?, ?, ?)
            ON CONFLICT(scope) DO UPDATE SET
                payload = excluded.payload,
                captured_at = excluded.captured_at
            ",
        )
        .bind(key.scope())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Stored snapshot {key}");
        Ok(())
    }

    /// Delete every snapshot whose scope starts with one of `prefixes`.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn clear_prefixes(&self, prefixes: &[&str]) {
        for prefix in prefixes {
            let result = sqlx::query(r"DELETE FROM snapshots WHERE substr(scope, 1, length(?)) = ?")
                .bind(*prefix)
                .bind(*prefix)
                .execute(&self.pool)
                .await;

            match result {
                Ok(done) => debug!("Cleared {} snapshots under {prefix}", done.rows_affected()),
                Err(e) => warn!("Unable to clear offline cache under {prefix}: {e}"),
            }
        }
    }

    /// Delete all group and message snapshots.
    pub async fn clear_offline_cache(&self) {
        self.clear_prefixes(&[GROUPS_PREFIX, MESSAGES_PREFIX]).await;
    }

    /// Cached group list of a contact.
    pub async fn cached_groups(&self, contact: &ContactId) -> Option<Vec<GroupSummary>> {
        self.get(&SnapshotKey::groups(contact))
            .await
            .map(|record| record.payload)
    }

    /// Store a contact's group list.
    pub async fn store_groups(&self, contact: &ContactId, groups: &[GroupSummary]) {
        self.set(&SnapshotKey::groups(contact), &groups).await;
    }

    /// Cached message list of a group.
    pub async fn cached_messages(
        &self,
        contact: &ContactId,
        group: &GroupId,
    ) -> Option<Vec<GroupMessage>> {
        self.get(&SnapshotKey::messages(contact, group))
            .await
            .map(|record| record.payload)
    }

    /// Store a group's message list.
    pub async fn store_messages(
        &self,
        contact: &ContactId,
        group: &GroupId,
        messages: &[GroupMessage],
    ) {
        self.set(&SnapshotKey::messages(contact, group), &messages)
            .await;
    }
}

//! SQLite-backed checkpoint storage (spec §4.2 "durable key/value store").
//!
//! One row per checkpoint, keyed by `(thread_id, checkpoint_ns, checkpoint_id)`
//! with an autoincrementing rowid giving insertion order within a thread —
//! "latest" is simply the highest rowid, since `put` is the only writer and
//! the store never reorders. `checkpoint_json`/`metadata_json` hold the
//! whole `Checkpoint`/`CheckpointMetadata` as opaque blobs rather than a
//! normalized schema; the channel values inside are arbitrary per-graph
//! JSON the store has no business indexing into.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::checkpoint::{ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple};
use crate::error::{CheckpointError, Result};
use crate::traits::{CheckpointSaver, CheckpointStream};

/// Durable alternative to [`crate::InMemoryCheckpointSaver`] for production
/// deployments (spec §6 `CHECKPOINT_DB_URL`).
#[derive(Clone)]
pub struct SqliteCheckpointSaver {
    pool: SqlitePool,
}

impl SqliteCheckpointSaver {
    /// Connect and ensure the schema exists. `database_url` is a standard
    /// sqlx SQLite URL, e.g. `sqlite://checkpoints.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                rowid INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                checkpoint_ns TEXT NOT NULL DEFAULT '',
                checkpoint_id TEXT NOT NULL,
                parent_checkpoint_id TEXT,
                checkpoint_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints(thread_id, checkpoint_ns)")
            .execute(&pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoint_writes (
                thread_id TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                value_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        Ok(Self { pool })
    }

    fn row_to_tuple(thread_id: String, checkpoint_ns: Option<String>, checkpoint_json: String, metadata_json: String, parent_checkpoint_id: Option<String>) -> Result<CheckpointTuple> {
        let checkpoint: Checkpoint = serde_json::from_str(&checkpoint_json)?;
        let metadata: CheckpointMetadata = serde_json::from_str(&metadata_json)?;
        let config = CheckpointConfig {
            thread_id: Some(thread_id),
            checkpoint_id: Some(checkpoint.id.clone()),
            checkpoint_ns: checkpoint_ns.clone(),
            extra: HashMap::new(),
        };
        let parent_config = parent_checkpoint_id.map(|id| CheckpointConfig {
            thread_id: config.thread_id.clone(),
            checkpoint_id: Some(id),
            checkpoint_ns,
            extra: HashMap::new(),
        });
        Ok(CheckpointTuple { config, checkpoint, metadata, parent_config })
    }
}

#[async_trait]
impl CheckpointSaver for SqliteCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = config.thread_id.as_ref().ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))?;
        let ns = config.checkpoint_ns.clone().unwrap_or_default();

        let row = if let Some(checkpoint_id) = &config.checkpoint_id {
            sqlx::query(
                "SELECT checkpoint_json, metadata_json, parent_checkpoint_id FROM checkpoints \
                 WHERE thread_id = ? AND checkpoint_ns = ? AND checkpoint_id = ?",
            )
            .bind(thread_id)
            .bind(&ns)
            .bind(checkpoint_id)
            .fetch_optional(&self.pool)
            .await
        } else {
            sqlx::query(
                "SELECT checkpoint_json, metadata_json, parent_checkpoint_id FROM checkpoints \
                 WHERE thread_id = ? AND checkpoint_ns = ? ORDER BY rowid DESC LIMIT 1",
            )
            .bind(thread_id)
            .bind(&ns)
            .fetch_optional(&self.pool)
            .await
        }
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        let checkpoint_json: String = row.try_get("checkpoint_json").map_err(|e| CheckpointError::Storage(e.to_string()))?;
        let metadata_json: String = row.try_get("metadata_json").map_err(|e| CheckpointError::Storage(e.to_string()))?;
        let parent_checkpoint_id: Option<String> = row.try_get("parent_checkpoint_id").map_err(|e| CheckpointError::Storage(e.to_string()))?;

        Self::row_to_tuple(thread_id.clone(), Some(ns), checkpoint_json, metadata_json, parent_checkpoint_id).map(Some)
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        _filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let thread_id = config
            .and_then(|c| c.thread_id.clone())
            .ok_or_else(|| CheckpointError::Invalid("thread_id is required for list".to_string()))?;
        let ns = config.and_then(|c| c.checkpoint_ns.clone()).unwrap_or_default();
        let limit = limit.unwrap_or(100) as i64;

        let rows = sqlx::query(
            "SELECT checkpoint_id, checkpoint_json, metadata_json, parent_checkpoint_id FROM checkpoints \
             WHERE thread_id = ? AND checkpoint_ns = ? ORDER BY rowid DESC LIMIT ?",
        )
        .bind(&thread_id)
        .bind(&ns)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        let before_id = before.and_then(|c| c.checkpoint_id.clone());
        let mut results = Vec::new();
        for row in rows {
            let checkpoint_id: String = row.try_get("checkpoint_id").map_err(|e| CheckpointError::Storage(e.to_string()))?;
            if before_id.as_deref() == Some(checkpoint_id.as_str()) {
                continue;
            }
            let checkpoint_json: String = row.try_get("checkpoint_json").map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let metadata_json: String = row.try_get("metadata_json").map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let parent_checkpoint_id: Option<String> = row.try_get("parent_checkpoint_id").map_err(|e| CheckpointError::Storage(e.to_string()))?;
            results.push(Self::row_to_tuple(thread_id.clone(), Some(ns.clone()), checkpoint_json, metadata_json, parent_checkpoint_id));
        }

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(&self, config: &CheckpointConfig, checkpoint: Checkpoint, metadata: CheckpointMetadata, _new_versions: ChannelVersions) -> Result<CheckpointConfig> {
        let thread_id = config.thread_id.as_ref().ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))?;
        let ns = config.checkpoint_ns.clone().unwrap_or_default();
        let checkpoint_json = serde_json::to_string(&checkpoint)?;
        let metadata_json = serde_json::to_string(&metadata)?;

        sqlx::query(
            "INSERT INTO checkpoints (thread_id, checkpoint_ns, checkpoint_id, parent_checkpoint_id, checkpoint_json, metadata_json) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(&ns)
        .bind(&checkpoint.id)
        .bind(&config.checkpoint_id)
        .bind(&checkpoint_json)
        .bind(&metadata_json)
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        Ok(CheckpointConfig { thread_id: Some(thread_id.clone()), checkpoint_id: Some(checkpoint.id), checkpoint_ns: Some(ns), extra: config.extra.clone() })
    }

    async fn put_writes(&self, config: &CheckpointConfig, writes: Vec<(String, serde_json::Value)>, task_id: String) -> Result<()> {
        let thread_id = config.thread_id.as_ref().ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))?;
        let checkpoint_id = config.checkpoint_id.as_ref().ok_or_else(|| CheckpointError::Invalid("checkpoint_id is required".to_string()))?;

        let mut tx = self.pool.begin().await.map_err(|e| CheckpointError::Storage(e.to_string()))?;
        for (channel, value) in writes {
            let value_json = serde_json::to_string(&value)?;
            sqlx::query("INSERT INTO checkpoint_writes (thread_id, checkpoint_id, task_id, channel, value_json) VALUES (?, ?, ?, ?, ?)")
                .bind(thread_id)
                .bind(checkpoint_id)
                .bind(&task_id)
                .bind(&channel)
                .bind(&value_json)
                .execute(&mut *tx)
                .await
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Deletes every checkpoint and pending write for `thread_id`, across
    /// all namespaces, in one transaction (spec §4.2 "reset operation").
    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| CheckpointError::Storage(e.to_string()))?;
        sqlx::query("DELETE FROM checkpoint_writes WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        tx.commit().await.map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }
}

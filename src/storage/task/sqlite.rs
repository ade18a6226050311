use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::TaskStore;
use crate::storage::{with_retry, StoreError, StoreResult};
use crate::tasks::types::{Task, TaskPatch};

/// SQLite-backed task store. One row per task; every merge is a single
/// guarded UPDATE so concurrent pollers never observe a half-applied
/// patch and terminal rows never change again.
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub async fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        info!("Initializing SQLite task store");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                format TEXT NOT NULL,
                total_records INTEGER NOT NULL DEFAULT 0,
                processed_records INTEGER NOT NULL DEFAULT 0,
                success_records INTEGER NOT NULL DEFAULT 0,
                failed_records INTEGER NOT NULL DEFAULT 0,
                errors TEXT NOT NULL DEFAULT '[]',
                file_name TEXT,
                file_path TEXT,
                error TEXT,
                search_name TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    fn row_to_task(row: &SqliteRow) -> StoreResult<Task> {
        let kind: String = row.get("kind");
        let status: String = row.get("status");
        let format: String = row.get("format");
        let errors: String = row.get("errors");
        let created_at: String = row.get("created_at");

        Ok(Task {
            id: row.get("id"),
            kind: kind.parse().map_err(StoreError::Fatal)?,
            status: status.parse().map_err(StoreError::Fatal)?,
            progress: row.get::<i64, _>("progress") as u8,
            format: format.parse().map_err(StoreError::Fatal)?,
            total_records: row.get::<i64, _>("total_records") as u64,
            processed_records: row.get::<i64, _>("processed_records") as u64,
            success_records: row.get::<i64, _>("success_records") as u64,
            failed_records: row.get::<i64, _>("failed_records") as u64,
            errors: serde_json::from_str(&errors)
                .map_err(|e| StoreError::Fatal(format!("corrupt errors column: {}", e)))?,
            file_name: row.get("file_name"),
            file_path: row.get("file_path"),
            error: row.get("error"),
            search_name: row.get("search_name"),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Fatal(format!("corrupt created_at column: {}", e)))?
                .with_timezone(&Utc),
        })
    }

    async fn fetch(&self, task_id: &str) -> StoreResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.as_ref().map(Self::row_to_task).transpose()
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: &Task) -> StoreResult<()> {
        with_retry("create task", || async {
            sqlx::query(
                r#"
                INSERT INTO tasks
                (id, kind, status, progress, format, total_records, processed_records,
                 success_records, failed_records, errors, file_name, file_path, error,
                 search_name, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )
            .bind(&task.id)
            .bind(task.kind.as_str())
            .bind(task.status.as_str())
            .bind(task.progress as i64)
            .bind(task.format.as_str())
            .bind(task.total_records as i64)
            .bind(task.processed_records as i64)
            .bind(task.success_records as i64)
            .bind(task.failed_records as i64)
            .bind(serde_json::to_string(&task.errors).unwrap_or_else(|_| "[]".into()))
            .bind(&task.file_name)
            .bind(&task.file_path)
            .bind(&task.error)
            .bind(&task.search_name)
            .bind(task.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, task_id: &str) -> StoreResult<Option<Task>> {
        with_retry("get task", || self.fetch(task_id)).await
    }

    async fn update(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        with_retry("update task", || async {
            let result = sqlx::query(
                r#"
                UPDATE tasks SET
                    status = COALESCE(?1, status),
                    progress = COALESCE(?2, progress),
                    total_records = COALESCE(?3, total_records),
                    processed_records = COALESCE(?4, processed_records),
                    success_records = COALESCE(?5, success_records),
                    file_name = COALESCE(?6, file_name),
                    file_path = COALESCE(?7, file_path),
                    error = COALESCE(?8, error)
                WHERE id = ?9 AND status NOT IN ('completed', 'failed')
                "#,
            )
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.progress.map(|p| p as i64))
            .bind(patch.total_records.map(|n| n as i64))
            .bind(patch.processed_records.map(|n| n as i64))
            .bind(patch.success_records.map(|n| n as i64))
            .bind(patch.file_name.as_deref())
            .bind(patch.file_path.as_deref())
            .bind(patch.error.as_deref())
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

            if result.rows_affected() == 0 {
                return match self.fetch(task_id).await? {
                    Some(_) => Err(StoreError::Terminal(task_id.to_string())),
                    None => Err(StoreError::NotFound(task_id.to_string())),
                };
            }

            self.fetch(task_id)
                .await?
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))
        })
        .await
    }

    async fn add_error(&self, task_id: &str, message: &str) -> StoreResult<()> {
        with_retry("append task error", || async {
            let result = sqlx::query(
                r#"
                UPDATE tasks SET
                    errors = json_insert(errors, '$[#]', ?1),
                    failed_records = failed_records + 1
                WHERE id = ?2 AND status NOT IN ('completed', 'failed')
                "#,
            )
            .bind(message)
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

            if result.rows_affected() == 0 {
                return match self.fetch(task_id).await? {
                    Some(_) => Err(StoreError::Terminal(task_id.to_string())),
                    None => Err(StoreError::NotFound(task_id.to_string())),
                };
            }
            Ok(())
        })
        .await
    }

    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        with_retry("cleanup expired tasks", || async {
            let result =
                sqlx::query("DELETE FROM tasks WHERE created_at < ?1 AND status != 'processing'")
                    .bind(cutoff.to_rfc3339())
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::from_sqlx)?;
            Ok(result.rows_affected())
        })
        .await
    }
}

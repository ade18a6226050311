use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::{InfoView, InfoViewStore, User, UserStore};
use crate::storage::{with_retry, StoreError, StoreResult};

/// SQLite backend for both record entities; shares one pool.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        info!("Initializing SQLite record store");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS info_views (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    fn parse_timestamp(column: &str, value: &str) -> StoreResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::Fatal(format!("corrupt {} column: {}", column, e)))
    }

    fn row_to_user(row: &SqliteRow) -> StoreResult<User> {
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        Ok(User {
            id: row.get("id"),
            name: row.get("name"),
            created_at: Self::parse_timestamp("created_at", &created_at)?,
            updated_at: Self::parse_timestamp("updated_at", &updated_at)?,
        })
    }

    fn row_to_info_view(row: &SqliteRow) -> StoreResult<InfoView> {
        let created_at: String = row.get("created_at");
        Ok(InfoView {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            created_at: Self::parse_timestamp("created_at", &created_at)?,
        })
    }
}

#[async_trait]
impl UserStore for SqliteRecordStore {
    async fn create(&self, name: &str) -> StoreResult<User> {
        with_retry("create user", || async {
            let now = Utc::now();
            let result =
                sqlx::query("INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?2)")
                    .bind(name)
                    .bind(now.to_rfc3339())
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::from_sqlx)?;
            Ok(User {
                id: result.last_insert_rowid(),
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    async fn get(&self, id: i64) -> StoreResult<Option<User>> {
        with_retry("get user", || async {
            let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
            row.as_ref().map(Self::row_to_user).transpose()
        })
        .await
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        with_retry("delete user", || async {
            let result = sqlx::query("DELETE FROM users WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn count(&self, name_filter: Option<&str>) -> StoreResult<u64> {
        with_retry("count users", || async {
            let count: i64 = match name_filter {
                Some(filter) => {
                    sqlx::query_scalar(
                        "SELECT COUNT(*) FROM users WHERE instr(lower(name), lower(?1)) > 0",
                    )
                    .bind(filter)
                    .fetch_one(&self.pool)
                    .await
                }
                None => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM users")
                        .fetch_one(&self.pool)
                        .await
                }
            }
            .map_err(StoreError::from_sqlx)?;
            Ok(count as u64)
        })
        .await
    }

    async fn list(
        &self,
        name_filter: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> StoreResult<Vec<User>> {
        with_retry("list users", || async {
            let rows = match name_filter {
                Some(filter) => {
                    sqlx::query(
                        r#"
                        SELECT * FROM users
                        WHERE instr(lower(name), lower(?1)) > 0
                        ORDER BY id ASC
                        LIMIT ?2 OFFSET ?3
                        "#,
                    )
                    .bind(filter)
                    .bind(limit as i64)
                    .bind(offset as i64)
                    .fetch_all(&self.pool)
                    .await
                }
                None => {
                    sqlx::query("SELECT * FROM users ORDER BY id ASC LIMIT ?1 OFFSET ?2")
                        .bind(limit as i64)
                        .bind(offset as i64)
                        .fetch_all(&self.pool)
                        .await
                }
            }
            .map_err(StoreError::from_sqlx)?;
            rows.iter().map(Self::row_to_user).collect()
        })
        .await
    }
}

#[async_trait]
impl InfoViewStore for SqliteRecordStore {
    async fn count(&self) -> StoreResult<u64> {
        with_retry("count info views", || async {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM info_views")
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
            Ok(count as u64)
        })
        .await
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<InfoView>> {
        with_retry("list info views", || async {
            let rows = sqlx::query("SELECT * FROM info_views ORDER BY id ASC LIMIT ?1 OFFSET ?2")
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
            rows.iter().map(Self::row_to_info_view).collect()
        })
        .await
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StoreResult;

pub mod sqlite;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// CRUD access to user records. The name filter is a case-insensitive
/// substring match wherever it appears.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn create(&self, name: &str) -> StoreResult<User>;
    async fn get(&self, id: i64) -> StoreResult<Option<User>>;
    /// Returns whether a record was actually removed.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
    async fn count(&self, name_filter: Option<&str>) -> StoreResult<u64>;
    async fn list(
        &self,
        name_filter: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> StoreResult<Vec<User>>;
}

/// Read-only listing of info view records.
#[async_trait]
pub trait InfoViewStore: Send + Sync + 'static {
    async fn count(&self) -> StoreResult<u64>;
    async fn list(&self, offset: u64, limit: u64) -> StoreResult<Vec<InfoView>>;
}

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::storage::StoreResult;
use crate::tasks::types::{Task, TaskPatch};

pub mod memory;
pub mod sqlite;

/// Keyed storage for task records, safe to share between the request
/// handler that creates a task, the producer that owns it, and any number
/// of concurrent pollers. Each call is atomic: a reader sees either all
/// of an update's fields or none of them. Updates against a Completed or
/// Failed task fail with `StoreError::Terminal`.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    async fn create(&self, task: &Task) -> StoreResult<()>;
    async fn get(&self, task_id: &str) -> StoreResult<Option<Task>>;
    async fn update(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task>;
    /// Appends one message to the task's error list and bumps its failed
    /// counter in the same atomic step.
    async fn add_error(&self, task_id: &str, message: &str) -> StoreResult<()>;
    /// Deletes tasks created before `cutoff`, sparing anything still
    /// Processing. Returns how many were removed.
    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests;

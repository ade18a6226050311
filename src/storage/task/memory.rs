use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::TaskStore;
use crate::storage::{StoreError, StoreResult};
use crate::tasks::types::{Task, TaskPatch, TaskStatus};

/// In-memory task store. Suitable for a single long-lived process and as
/// the substitutable fake in tests; the lock makes each operation atomic
/// with respect to concurrent pollers.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: &Task) -> StoreResult<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(StoreError::Fatal(format!("duplicate task id: {}", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, task_id: &str) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn update(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        if task.status.is_terminal() {
            return Err(StoreError::Terminal(task_id.to_string()));
        }
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn add_error(&self, task_id: &str, message: &str) -> StoreResult<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        if task.status.is_terminal() {
            return Err(StoreError::Terminal(task_id.to_string()));
        }
        task.errors.push(message.to_string());
        task.failed_records += 1;
        Ok(())
    }

    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, t| t.status == TaskStatus::Processing || t.created_at >= cutoff);
        Ok((before - tasks.len()) as u64)
    }
}

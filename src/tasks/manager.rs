use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::storage::task::TaskStore;
use crate::storage::{StoreError, StoreResult};
use crate::tasks::progress::compute_progress;
use crate::tasks::types::{Task, TaskFormat, TaskKind, TaskPatch, TaskStatus};

/// Tasks older than this become eligible for the expiry sweep.
pub const RETENTION_HOURS: i64 = 24;

/// Owns task creation, merge-updates and expiry on top of an injected
/// store. The percentage arithmetic lives here so producers never repeat
/// it at each update site.
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Timestamp plus random suffix: sortable for humans, collision
    /// resistant without a central counter.
    fn allocate_id(kind: TaskKind) -> String {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}", kind, timestamp, &suffix[..8])
    }

    pub async fn create_task(
        &self,
        kind: TaskKind,
        format: TaskFormat,
        search_name: Option<String>,
    ) -> StoreResult<Task> {
        let task = Task {
            id: Self::allocate_id(kind),
            kind,
            status: TaskStatus::Pending,
            progress: 0,
            format,
            total_records: 0,
            processed_records: 0,
            success_records: 0,
            failed_records: 0,
            errors: Vec::new(),
            file_name: None,
            file_path: None,
            error: None,
            search_name,
            created_at: Utc::now(),
        };
        self.store.create(&task).await?;
        info!("created {} task {}", kind, task.id);
        Ok(task)
    }

    pub async fn get_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        self.store.get(task_id).await
    }

    /// Merges a patch into the stored task. A patch carrying counters but
    /// no explicit progress gets the percentage recomputed from the
    /// merged values; completing a task pins progress at 100. Recomputed
    /// values stop at 99 — 100 is reserved for the Completed transition.
    pub async fn update_task(&self, task_id: &str, mut patch: TaskPatch) -> StoreResult<Task> {
        if patch.progress.is_none() {
            if patch.status == Some(TaskStatus::Completed) {
                patch.progress = Some(100);
            } else if patch.processed_records.is_some() || patch.total_records.is_some() {
                let current = self
                    .store
                    .get(task_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
                let total = patch.total_records.unwrap_or(current.total_records);
                let processed = patch.processed_records.unwrap_or(current.processed_records);
                patch.progress = Some(compute_progress(processed, total).min(99));
            }
        }
        self.store.update(task_id, &patch).await
    }

    pub async fn add_error(&self, task_id: &str, message: &str) -> StoreResult<()> {
        self.store.add_error(task_id, message).await
    }

    /// Terminal failure path used by producer catch-alls: whatever state
    /// the task was in, it ends Failed with a human-readable reason.
    pub async fn fail_task(&self, task_id: &str, reason: &str) -> StoreResult<Task> {
        self.store
            .update(
                task_id,
                &TaskPatch {
                    status: Some(TaskStatus::Failed),
                    error: Some(reason.to_string()),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn cleanup_expired_tasks(&self) -> StoreResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::hours(RETENTION_HOURS);
        let removed = self.store.cleanup_expired(cutoff).await?;
        if removed > 0 {
            info!("expiry sweep removed {} task(s)", removed);
        }
        Ok(removed)
    }
}

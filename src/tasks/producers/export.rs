use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};

use crate::codec;
use crate::storage::users::UserStore;
use crate::tasks::manager::TaskManager;
use crate::tasks::progress::compute_phase_progress;
use crate::tasks::types::{TaskFormat, TaskPatch, TaskStatus};

pub const EXPORT_BATCH_SIZE: u64 = 1000;

/// The batch-fetch phase tops out below 100 so the serialize/write phase
/// stays visible to pollers.
const FETCH_PHASE_MAX: u8 = 95;

/// Streams matching user records out of the store in batches, serializes
/// them and finalizes the owning task with a downloadable file. Runs
/// detached; the dispatching request has long since returned.
pub struct ExportProducer {
    tasks: Arc<TaskManager>,
    users: Arc<dyn UserStore>,
    export_dir: PathBuf,
}

impl ExportProducer {
    pub fn new(tasks: Arc<TaskManager>, users: Arc<dyn UserStore>, export_dir: PathBuf) -> Self {
        Self {
            tasks,
            users,
            export_dir,
        }
    }

    /// Fire-and-forget dispatch. There is no cancellation channel; the
    /// job runs to a terminal state on its own.
    pub fn spawn(self, task_id: String, format: TaskFormat, search_name: Option<String>) {
        tokio::spawn(async move {
            self.run(&task_id, format, search_name.as_deref()).await;
        });
    }

    pub async fn run(&self, task_id: &str, format: TaskFormat, search_name: Option<&str>) {
        if let Err(e) = self.run_inner(task_id, format, search_name).await {
            error!("export task {} failed: {:#}", task_id, e);
            if let Err(e) = self.tasks.fail_task(task_id, &format!("{:#}", e)).await {
                error!("failed to record failure for task {}: {}", task_id, e);
            }
        }
    }

    async fn run_inner(
        &self,
        task_id: &str,
        format: TaskFormat,
        search_name: Option<&str>,
    ) -> Result<()> {
        // early nonzero marker so pollers can tell "confirmed running"
        // from "accepted"
        self.tasks
            .update_task(
                task_id,
                TaskPatch {
                    status: Some(TaskStatus::Processing),
                    progress: Some(1),
                    ..Default::default()
                },
            )
            .await?;

        let total = self.users.count(search_name).await?;
        self.tasks
            .update_task(
                task_id,
                TaskPatch {
                    total_records: Some(total),
                    processed_records: Some(0),
                    progress: Some(1),
                    ..Default::default()
                },
            )
            .await?;

        let mut records = Vec::with_capacity(total as usize);
        let mut processed = 0u64;
        while processed < total {
            let batch = self
                .users
                .list(search_name, processed, EXPORT_BATCH_SIZE)
                .await?;
            if batch.is_empty() {
                break;
            }
            processed += batch.len() as u64;
            records.extend(batch);
            let pct = compute_phase_progress(processed, total, FETCH_PHASE_MAX).max(1);
            self.tasks
                .update_task(
                    task_id,
                    TaskPatch {
                        processed_records: Some(processed),
                        progress: Some(pct),
                        ..Default::default()
                    },
                )
                .await?;
        }

        // write phase: fixed checkpoints for prepare, encode, write
        self.checkpoint(task_id, 96).await?;
        let bytes = codec::encode_users(&records, format).context("failed to serialize export")?;
        self.checkpoint(task_id, 97).await?;

        let file_name = format!(
            "users_export_{}.{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        );
        let file_path = self.export_dir.join(&file_name);
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .context("failed to create export directory")?;
        tokio::fs::write(&file_path, &bytes)
            .await
            .context("failed to write export file")?;
        self.checkpoint(task_id, 98).await?;

        self.tasks
            .update_task(
                task_id,
                TaskPatch {
                    status: Some(TaskStatus::Completed),
                    progress: Some(100),
                    processed_records: Some(processed),
                    file_name: Some(file_name),
                    file_path: Some(file_path.to_string_lossy().into_owned()),
                    ..Default::default()
                },
            )
            .await?;

        info!("export task {} completed ({} records)", task_id, processed);
        Ok(())
    }

    async fn checkpoint(&self, task_id: &str, progress: u8) -> Result<()> {
        self.tasks
            .update_task(
                task_id,
                TaskPatch {
                    progress: Some(progress),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}

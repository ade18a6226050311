use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::codec;
use crate::storage::users::UserStore;
use crate::tasks::manager::TaskManager;
use crate::tasks::types::{TaskFormat, TaskPatch, TaskStatus};

/// Parses an uploaded file and inserts each record into the user store,
/// accumulating per-record successes and failures on the owning task. A
/// bad record never aborts the batch; the task completes with its error
/// list populated.
pub struct ImportProducer {
    tasks: Arc<TaskManager>,
    users: Arc<dyn UserStore>,
}

impl ImportProducer {
    pub fn new(tasks: Arc<TaskManager>, users: Arc<dyn UserStore>) -> Self {
        Self { tasks, users }
    }

    pub fn spawn(self, task_id: String, file_path: PathBuf, format: TaskFormat) {
        tokio::spawn(async move {
            self.run(&task_id, &file_path, format).await;
        });
    }

    pub async fn run(&self, task_id: &str, file_path: &Path, format: TaskFormat) {
        let result = self.run_inner(task_id, file_path, format).await;

        // the uploaded file is spent either way; removal failures are
        // logged, not escalated
        if let Err(e) = tokio::fs::remove_file(file_path).await {
            warn!(
                "failed to remove uploaded file {}: {}",
                file_path.display(),
                e
            );
        }

        if let Err(e) = result {
            error!("import task {} failed: {:#}", task_id, e);
            if let Err(e) = self.tasks.fail_task(task_id, &format!("{:#}", e)).await {
                error!("failed to record failure for task {}: {}", task_id, e);
            }
        }
    }

    async fn run_inner(&self, task_id: &str, file_path: &Path, format: TaskFormat) -> Result<()> {
        // the facade already pre-validated the upload; a parse failure
        // here means the file changed or vanished since, which is fatal
        let records =
            codec::parse_file(file_path, format).context("failed to parse uploaded file")?;
        let total = records.len() as u64;

        self.tasks
            .update_task(
                task_id,
                TaskPatch {
                    status: Some(TaskStatus::Processing),
                    total_records: Some(total),
                    processed_records: Some(0),
                    ..Default::default()
                },
            )
            .await?;

        let mut processed = 0u64;
        let mut succeeded = 0u64;
        for record in &records {
            processed += 1;
            let name = record.name.trim();
            if name.is_empty() {
                self.tasks
                    .add_error(task_id, &format!("record {}: empty name", record.position))
                    .await?;
            } else {
                match self.users.create(name).await {
                    Ok(_) => succeeded += 1,
                    Err(e) => {
                        self.tasks
                            .add_error(task_id, &format!("record {}: {}", record.position, e))
                            .await?;
                    }
                }
            }
            self.tasks
                .update_task(
                    task_id,
                    TaskPatch {
                        processed_records: Some(processed),
                        success_records: Some(succeeded),
                        ..Default::default()
                    },
                )
                .await?;
        }

        self.tasks
            .update_task(
                task_id,
                TaskPatch {
                    status: Some(TaskStatus::Completed),
                    progress: Some(100),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "import task {} completed: {} of {} records imported",
            task_id, succeeded, total
        );
        Ok(())
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::error;

use super::TaskManager;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawns the hourly expiry sweep. Runs for the life of the process;
/// sweep failures are logged and the loop keeps going.
pub fn spawn_sweeper(manager: Arc<TaskManager>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = manager.cleanup_expired_tasks().await {
                error!("task expiry sweep failed: {}", e);
            }
        }
    })
}

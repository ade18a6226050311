use anyhow::Result;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use ums_rs::storage::task::sqlite::SqliteTaskStore;
use ums_rs::storage::users::sqlite::SqliteRecordStore;
use ums_rs::tasks::{sweeper, TaskManager};
use ums_rs::utils::logger;
use ums_rs::{AppContext, BIND_ADDR, EXPORT_PATH, SQLITE_PATH, UPLOAD_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    ums_rs::init_env();
    let _guard = logger::init("./logs".to_string())?;

    info!("Starting user management service...");

    info!("Initializing Storage...");
    let pool = SqlitePool::connect(&SQLITE_PATH).await?;
    let record_store = Arc::new(SqliteRecordStore::new(pool.clone()).await?);
    let task_store = Arc::new(SqliteTaskStore::new(pool).await?);

    info!("Initializing Task Manager...");
    let task_manager = Arc::new(TaskManager::new(task_store));
    sweeper::spawn_sweeper(task_manager.clone());

    let ctx = Arc::new(AppContext {
        users: record_store.clone(),
        info_views: record_store,
        tasks: task_manager,
        export_dir: PathBuf::from(&*EXPORT_PATH),
        upload_dir: PathBuf::from(&*UPLOAD_PATH),
    });

    let addr: SocketAddr = BIND_ADDR.parse()?;
    info!("Starting HTTP server at http://{}", addr);

    match ums_rs::web::start_server(ctx, addr).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            tracing::error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

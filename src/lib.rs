pub mod codec;
pub mod storage;
pub mod tasks;
pub mod utils;
pub mod web;

use std::path::PathBuf;
use std::{env, sync::Arc};

use once_cell::sync::Lazy;

use storage::users::{InfoViewStore, UserStore};
use tasks::TaskManager;

pub struct AppContext {
    pub users: Arc<dyn UserStore>,
    pub info_views: Arc<dyn InfoViewStore>,
    pub tasks: Arc<TaskManager>,
    pub export_dir: PathBuf,
    pub upload_dir: PathBuf,
}

const UMS_SQLITE_PATH: &str = "sqlite://./ums_data/database/storage.db?mode=rwc";
const UMS_EXPORT_PATH: &str = "./ums_data/exports/";
const UMS_UPLOAD_PATH: &str = "./ums_data/uploads/";
const UMS_BIND_ADDR: &str = "127.0.0.1:7300";

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) => value,
        Err(_) => dotenv::var(key).unwrap_or_else(|_| default.to_string()),
    }
}

pub static SQLITE_PATH: Lazy<String> = Lazy::new(|| env_or("UMS_SQLITE_PATH", UMS_SQLITE_PATH));

pub static EXPORT_PATH: Lazy<String> = Lazy::new(|| env_or("UMS_EXPORT_PATH", UMS_EXPORT_PATH));

pub static UPLOAD_PATH: Lazy<String> = Lazy::new(|| env_or("UMS_UPLOAD_PATH", UMS_UPLOAD_PATH));

pub static BIND_ADDR: Lazy<String> = Lazy::new(|| env_or("UMS_BIND_ADDR", UMS_BIND_ADDR));

pub fn init_env() {
    dotenv::dotenv().ok();

    if let Some(db_path) = SQLITE_PATH.strip_prefix("sqlite://") {
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        if let Some(dir) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(dir).unwrap_or_else(|e| {
                eprintln!("Failed to create database directory: {}", e);
            });
        }
    }
    for dir in [&*EXPORT_PATH, &*UPLOAD_PATH] {
        std::fs::create_dir_all(dir).unwrap_or_else(|e| {
            eprintln!("Failed to create data directory {}: {}", dir, e);
        });
    }
}

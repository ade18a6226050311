use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::tempdir;

use crate::storage::task::memory::MemoryTaskStore;
use crate::storage::users::sqlite::SqliteRecordStore;
use crate::storage::users::UserStore;
use crate::storage::StoreError;
use crate::tasks::manager::TaskManager;
use crate::tasks::producers::{ExportProducer, ImportProducer};
use crate::tasks::types::{Task, TaskFormat, TaskKind, TaskPatch, TaskStatus};

fn manager() -> Arc<TaskManager> {
    Arc::new(TaskManager::new(Arc::new(MemoryTaskStore::new())))
}

async fn user_store() -> Arc<SqliteRecordStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    Arc::new(SqliteRecordStore::new(pool).await.unwrap())
}

#[tokio::test]
async fn task_ids_are_unique_and_kind_prefixed() {
    let manager = manager();
    let a = manager
        .create_task(TaskKind::Export, TaskFormat::Json, None)
        .await
        .unwrap();
    let b = manager
        .create_task(TaskKind::Export, TaskFormat::Json, None)
        .await
        .unwrap();
    let c = manager
        .create_task(TaskKind::Import, TaskFormat::Csv, None)
        .await
        .unwrap();

    assert_ne!(a.id, b.id);
    assert!(a.id.starts_with("export_"));
    assert!(c.id.starts_with("import_"));
    assert_eq!(a.status, TaskStatus::Pending);
    assert_eq!(a.progress, 0);
}

#[tokio::test]
async fn counter_patches_recompute_progress() {
    let manager = manager();
    let task = manager
        .create_task(TaskKind::Import, TaskFormat::Json, None)
        .await
        .unwrap();

    let updated = manager
        .update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Processing),
                total_records: Some(4),
                processed_records: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.progress, 0);

    let updated = manager
        .update_task(
            &task.id,
            TaskPatch {
                processed_records: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.progress, 25);

    let updated = manager
        .update_task(
            &task.id,
            TaskPatch {
                processed_records: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.progress, 75);

    // completing pins the percentage even without an explicit value
    let updated = manager
        .update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.progress, 100);
}

#[tokio::test]
async fn progress_is_monotone_for_monotone_counters() {
    let manager = manager();
    let task = manager
        .create_task(TaskKind::Import, TaskFormat::Json, None)
        .await
        .unwrap();
    manager
        .update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Processing),
                total_records: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut last = 0;
    for processed in 0..=7 {
        let updated = manager
            .update_task(
                &task.id,
                TaskPatch {
                    processed_records: Some(processed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.progress >= last);
        last = updated.progress;
    }
    // 100 is reserved for completion
    assert_eq!(last, 99);
}

#[tokio::test]
async fn terminal_status_cannot_regress() {
    let manager = manager();
    let task = manager
        .create_task(TaskKind::Export, TaskFormat::Json, None)
        .await
        .unwrap();
    manager
        .update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Completed),
                progress: Some(100),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = manager
        .update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Processing),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Terminal(_)));

    let reloaded = manager.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, TaskStatus::Completed);
}

#[tokio::test]
async fn expiry_sweep_removes_only_old_tasks() {
    let manager = manager();

    let mut stale = Task {
        id: "export_stale".to_string(),
        kind: TaskKind::Export,
        status: TaskStatus::Completed,
        progress: 100,
        format: TaskFormat::Json,
        total_records: 0,
        processed_records: 0,
        success_records: 0,
        failed_records: 0,
        errors: Vec::new(),
        file_name: None,
        file_path: None,
        error: None,
        search_name: None,
        created_at: Utc::now() - Duration::hours(25),
    };
    manager.store().create(&stale).await.unwrap();
    stale.id = "export_stale_2".to_string();
    manager.store().create(&stale).await.unwrap();

    let fresh = manager
        .create_task(TaskKind::Export, TaskFormat::Json, None)
        .await
        .unwrap();

    let removed = manager.cleanup_expired_tasks().await.unwrap();
    assert_eq!(removed, 2);
    assert!(manager.get_task("export_stale").await.unwrap().is_none());
    assert!(manager.get_task(&fresh.id).await.unwrap().is_some());
}

#[tokio::test]
async fn export_with_no_matches_completes_with_empty_file() {
    let manager = manager();
    let users = user_store().await;
    let dir = tempdir().unwrap();

    let task = manager
        .create_task(TaskKind::Export, TaskFormat::Json, Some("nobody".to_string()))
        .await
        .unwrap();
    ExportProducer::new(manager.clone(), users, dir.path().to_path_buf())
        .run(&task.id, TaskFormat::Json, Some("nobody"))
        .await;

    let task = manager.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100);
    assert_eq!(task.total_records, 0);

    let file_path = task.file_path.unwrap();
    let bytes = std::fs::read(&file_path).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["total"], 0);
    assert_eq!(value["users"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn export_filters_and_serializes_csv() {
    let manager = manager();
    let users = user_store().await;
    for name in ["Alice", "bob", "Carmen"] {
        users.create(name).await.unwrap();
    }
    let dir = tempdir().unwrap();

    let task = manager
        .create_task(TaskKind::Export, TaskFormat::Csv, Some("a".to_string()))
        .await
        .unwrap();
    ExportProducer::new(manager.clone(), users, dir.path().to_path_buf())
        .run(&task.id, TaskFormat::Csv, Some("a"))
        .await;

    let task = manager.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.total_records, 2);
    assert_eq!(task.processed_records, 2);
    assert!(task.file_name.as_deref().unwrap().ends_with(".csv"));

    let bytes = std::fs::read(task.file_path.unwrap()).unwrap();
    assert!(bytes.starts_with(b"\xef\xbb\xbf"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert!(text.contains("Alice"));
    assert!(text.contains("Carmen"));
    assert!(!text.contains("bob"));
}

#[tokio::test]
async fn import_partial_failure_still_completes() {
    let manager = manager();
    let users = user_store().await;
    let dir = tempdir().unwrap();

    // records 3 and 7 carry whitespace-only names
    let names: Vec<String> = (1..=10)
        .map(|i| {
            if i == 3 || i == 7 {
                "   ".to_string()
            } else {
                format!("user-{}", i)
            }
        })
        .collect();
    let body: Vec<serde_json::Value> = names
        .iter()
        .map(|name| serde_json::json!({ "name": name }))
        .collect();
    let upload = dir.path().join("users.json");
    std::fs::write(&upload, serde_json::to_vec(&body).unwrap()).unwrap();

    let task = manager
        .create_task(TaskKind::Import, TaskFormat::Json, None)
        .await
        .unwrap();
    ImportProducer::new(manager.clone(), users.clone())
        .run(&task.id, &upload, TaskFormat::Json)
        .await;

    let task = manager.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100);
    assert_eq!(task.total_records, 10);
    assert_eq!(task.processed_records, 10);
    assert_eq!(task.success_records, 8);
    assert_eq!(task.failed_records, 2);
    assert_eq!(task.errors.len(), 2);
    assert!(task.errors[0].contains("record 3"));
    assert!(task.errors[1].contains("record 7"));

    // records landed in the store and the upload was removed
    assert_eq!(UserStore::count(users.as_ref(), None).await.unwrap(), 8);
    assert!(!Path::new(&upload).exists());
}

#[tokio::test]
async fn import_with_unreadable_file_fails_task() {
    let manager = manager();
    let users = user_store().await;
    let dir = tempdir().unwrap();
    let missing = dir.path().join("vanished.json");

    let task = manager
        .create_task(TaskKind::Import, TaskFormat::Json, None)
        .await
        .unwrap();
    ImportProducer::new(manager.clone(), users)
        .run(&task.id, &missing, TaskFormat::Json)
        .await;

    let task = manager.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.unwrap().contains("parse"));
}

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;

use super::memory::MemoryTaskStore;
use super::sqlite::SqliteTaskStore;
use super::TaskStore;
use crate::storage::StoreError;
use crate::tasks::types::{Task, TaskFormat, TaskKind, TaskPatch, TaskStatus};

fn sample_task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        kind: TaskKind::Export,
        status: TaskStatus::Pending,
        progress: 0,
        format: TaskFormat::Json,
        total_records: 0,
        processed_records: 0,
        success_records: 0,
        failed_records: 0,
        errors: Vec::new(),
        file_name: None,
        file_path: None,
        error: None,
        search_name: Some("smith".to_string()),
        created_at: Utc::now(),
    }
}

// every test runs against both backends; they share one contract
async fn stores() -> Vec<Arc<dyn TaskStore>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let sqlite = SqliteTaskStore::new(pool).await.unwrap();
    vec![Arc::new(MemoryTaskStore::new()), Arc::new(sqlite)]
}

#[tokio::test]
async fn create_and_get_roundtrip() {
    for store in stores().await {
        let task = sample_task("export_1");
        store.create(&task).await.unwrap();

        let loaded = store.get("export_1").await.unwrap().unwrap();
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.kind, TaskKind::Export);
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert_eq!(loaded.format, TaskFormat::Json);
        assert_eq!(loaded.search_name.as_deref(), Some("smith"));
        assert!(loaded.errors.is_empty());
    }
}

#[tokio::test]
async fn get_unknown_returns_none() {
    for store in stores().await {
        assert!(store.get("nonexistent").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn update_merges_only_given_fields() {
    for store in stores().await {
        store.create(&sample_task("export_1")).await.unwrap();

        let updated = store
            .update(
                "export_1",
                &TaskPatch {
                    status: Some(TaskStatus::Processing),
                    progress: Some(40),
                    total_records: Some(10),
                    processed_records: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Processing);
        assert_eq!(updated.progress, 40);
        assert_eq!(updated.total_records, 10);
        assert_eq!(updated.processed_records, 4);
        // untouched fields survive the merge
        assert_eq!(updated.search_name.as_deref(), Some("smith"));
        assert_eq!(updated.format, TaskFormat::Json);
    }
}

#[tokio::test]
async fn update_unknown_is_not_found() {
    for store in stores().await {
        let err = store
            .update("nonexistent", &TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}

#[tokio::test]
async fn terminal_tasks_reject_further_mutation() {
    for store in stores().await {
        store.create(&sample_task("export_1")).await.unwrap();
        store
            .update(
                "export_1",
                &TaskPatch {
                    status: Some(TaskStatus::Completed),
                    progress: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = store
            .update(
                "export_1",
                &TaskPatch {
                    status: Some(TaskStatus::Processing),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Terminal(_)));

        let err = store.add_error("export_1", "late").await.unwrap_err();
        assert!(matches!(err, StoreError::Terminal(_)));

        // the record itself is untouched
        let task = store.get("export_1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert!(task.errors.is_empty());
    }
}

#[tokio::test]
async fn add_error_appends_and_counts() {
    for store in stores().await {
        let mut task = sample_task("import_1");
        task.kind = TaskKind::Import;
        store.create(&task).await.unwrap();

        store
            .add_error("import_1", "record 3: empty name")
            .await
            .unwrap();
        store
            .add_error("import_1", "record 7: empty name")
            .await
            .unwrap();

        let task = store.get("import_1").await.unwrap().unwrap();
        assert_eq!(task.failed_records, 2);
        assert_eq!(
            task.errors,
            vec!["record 3: empty name", "record 7: empty name"]
        );
    }
}

#[tokio::test]
async fn expiry_sweep_spares_recent_and_processing() {
    for store in stores().await {
        let mut expired = sample_task("export_old");
        expired.created_at = Utc::now() - Duration::hours(25);
        store.create(&expired).await.unwrap();

        let mut slow = sample_task("export_slow");
        slow.status = TaskStatus::Processing;
        slow.created_at = Utc::now() - Duration::hours(25);
        store.create(&slow).await.unwrap();

        store.create(&sample_task("export_fresh")).await.unwrap();

        let cutoff = Utc::now() - Duration::hours(24);
        let removed = store.cleanup_expired(cutoff).await.unwrap();
        assert_eq!(removed, 1);

        assert!(store.get("export_old").await.unwrap().is_none());
        assert!(store.get("export_slow").await.unwrap().is_some());
        assert!(store.get("export_fresh").await.unwrap().is_some());
    }
}

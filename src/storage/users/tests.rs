use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use super::sqlite::SqliteRecordStore;
use super::{InfoViewStore, UserStore};

async fn setup() -> (SqliteRecordStore, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteRecordStore::new(pool.clone()).await.unwrap();
    (store, pool)
}

#[tokio::test]
async fn create_get_delete_roundtrip() {
    let (store, _pool) = setup().await;

    let user = store.create("Jane Doe").await.unwrap();
    assert!(user.id > 0);
    assert_eq!(user.name, "Jane Doe");

    let loaded = store.get(user.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Jane Doe");

    assert!(store.delete(user.id).await.unwrap());
    assert!(store.get(user.id).await.unwrap().is_none());
    // second delete is a no-op
    assert!(!store.delete(user.id).await.unwrap());
}

#[tokio::test]
async fn name_filter_is_case_insensitive_substring() {
    let (store, _pool) = setup().await;
    for name in ["Alice", "bob", "CAROL", "alan"] {
        store.create(name).await.unwrap();
    }

    assert_eq!(UserStore::count(&store, Some("al")).await.unwrap(), 2);
    let matched = UserStore::list(&store, Some("AL"), 0, 10).await.unwrap();
    let names: Vec<&str> = matched.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "alan"]);

    assert_eq!(UserStore::count(&store, None).await.unwrap(), 4);
    assert_eq!(UserStore::count(&store, Some("zzz")).await.unwrap(), 0);
}

#[tokio::test]
async fn listing_paginates_in_id_order() {
    let (store, _pool) = setup().await;
    for i in 0..5 {
        store.create(&format!("user-{}", i)).await.unwrap();
    }

    let page = UserStore::list(&store, None, 2, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "user-2");
    assert_eq!(page[1].name, "user-3");

    let tail = UserStore::list(&store, None, 4, 10).await.unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].name, "user-4");
}

#[tokio::test]
async fn info_view_listing() {
    let (store, pool) = setup().await;

    for i in 0..3 {
        sqlx::query("INSERT INTO info_views (title, content, created_at) VALUES (?1, ?2, ?3)")
            .bind(format!("view-{}", i))
            .bind("content")
            .bind(Utc::now().to_rfc3339())
            .execute(&pool)
            .await
            .unwrap();
    }

    assert_eq!(InfoViewStore::count(&store).await.unwrap(), 3);
    let views = InfoViewStore::list(&store, 1, 10).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].title, "view-1");
}

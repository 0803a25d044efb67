use super::*;

#[tokio::test]
async fn missing_key_reads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get("watched-profiles").await.expect("get"), None);
}

#[tokio::test]
async fn set_then_get_returns_latest_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .set("design-preferences", r#"{"minimal":false}"#)
        .await
        .expect("first write");
    storage
        .set("design-preferences", r#"{"minimal":true}"#)
        .await
        .expect("overwrite");

    let value = storage
        .get("design-preferences")
        .await
        .expect("get")
        .expect("stored value");
    assert_eq!(value, r#"{"minimal":true}"#);
    assert_eq!(
        storage.keys().await.expect("keys"),
        vec!["design-preferences".to_string()]
    );
}

#[tokio::test]
async fn remove_reports_whether_key_existed() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("watched-profiles", "[]").await.expect("write");

    assert!(storage.remove("watched-profiles").await.expect("remove"));
    assert!(!storage.remove("watched-profiles").await.expect("remove again"));
    assert_eq!(storage.get("watched-profiles").await.expect("get"), None);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("settings.sqlite3");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn file_backed_values_survive_reopen() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("settings.sqlite3");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .set("watched-profiles", r#"[{"id":"1","username":"alice"}]"#)
        .await
        .expect("write");
    storage.pool().close().await;

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let value = reopened
        .get("watched-profiles")
        .await
        .expect("get")
        .expect("persisted value");
    assert_eq!(value, r#"[{"id":"1","username":"alice"}]"#);
}

#[tokio::test]
async fn memory_store_clones_share_entries() {
    let store = MemoryStore::new();
    let other = store.clone();

    store.set("design-preferences", "{}").await.expect("write");

    assert_eq!(
        other.get("design-preferences").await.expect("get"),
        Some("{}".to_string())
    );
    assert_eq!(other.snapshot().await.len(), 1);
}

#[test]
fn sqlite_path_ignores_memory_and_query_string() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/settings.db?mode=rwc"),
        Some(PathBuf::from("./data/settings.db"))
    );
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
}

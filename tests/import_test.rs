mod helpers;

use automem::bridge::{Category, SyncMode};
use automem::bridge::{AutoMemoryBridge, BridgeSettings};
use automem::store::{Store, StoreQuery};
use helpers::{bridge_on, insight, FlakyStore};
use std::sync::Arc;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn import_on_nonexistent_directory_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("never-created");
    let (bridge, _store) = bridge_on(&missing, SyncMode::OnSessionEnd);

    let report = bridge.import_from_auto_memory().await.unwrap();
    assert_eq!(report.imported, 0);
    assert!(report.files.is_empty());
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn import_roundtrips_synced_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let (bridge, store) = bridge_on(tmp.path(), SyncMode::OnSessionEnd);

    bridge
        .record_insight(insight(Category::Debugging, "Retry with backoff on 429", 0.9))
        .await
        .unwrap();
    bridge.sync_to_auto_memory().await.unwrap();

    let report = bridge.import_from_auto_memory().await.unwrap();

    // Topic files carry `#` headers only; the `##` sections come from the
    // index, which import also walks.
    assert!(report.files.contains(&"debugging.md".to_string()));
    assert!(report.files.contains(&"MEMORY.md".to_string()));
    assert_eq!(report.imported, 1);

    let imported = store
        .query(StoreQuery::default().namespace("auto-memory"))
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].key, "auto-memory:MEMORY.md:Debugging");
    assert!(imported[0].content.contains("- Retry with backoff on 429"));
    assert!(imported[0].tags.contains(&"auto-memory".to_string()));
    assert!(imported[0].tags.contains(&"MEMORY".to_string()));
}

#[tokio::test]
async fn import_skips_sections_already_in_store() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("notes.md"),
        "# Notes\n\n## Alpha\ncontent a\n\n## Beta\ncontent b\n",
    )
    .unwrap();

    let (bridge, _store) = bridge_on(tmp.path(), SyncMode::OnSessionEnd);

    let first = bridge.import_from_auto_memory().await.unwrap();
    assert_eq!(first.imported, 2);
    assert_eq!(first.skipped, 0);

    let second = bridge.import_from_auto_memory().await.unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 2);
}

#[tokio::test]
async fn sectionless_files_count_but_contribute_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("debugging.md"), "# Debugging\n\n- a bullet\n").unwrap();

    let (bridge, store) = bridge_on(tmp.path(), SyncMode::OnSessionEnd);
    let report = bridge.import_from_auto_memory().await.unwrap();

    assert_eq!(report.files, vec!["debugging.md".to_string()]);
    assert_eq!(report.imported, 0);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn import_preserves_summaries_written_by_sync() {
    let tmp = tempfile::tempdir().unwrap();
    let (bridge, store) = bridge_on(tmp.path(), SyncMode::OnSessionEnd);

    let summary = "Always pin the schema version";
    bridge
        .record_insight(insight(Category::Architecture, summary, 0.85))
        .await
        .unwrap();
    bridge.sync_to_auto_memory().await.unwrap();
    bridge.import_from_auto_memory().await.unwrap();

    let imported = store
        .query(StoreQuery::default().namespace("auto-memory"))
        .await
        .unwrap();
    // The index section holds the cleaned summary, no metadata suffix.
    assert!(imported.iter().any(|e| e.content.contains(&format!("- {summary}"))));
    assert!(imported.iter().all(|e| !e.content.contains("conf:")));
}

#[tokio::test]
async fn bulk_insert_failure_is_reported_not_thrown() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("notes.md"), "# Notes\n\n## Alpha\ncontent a\n").unwrap();

    let store = Arc::new(FlakyStore::new());
    store.fail_bulk_insert.store(true, Ordering::SeqCst);
    let bridge = AutoMemoryBridge::new(
        store.clone(),
        BridgeSettings::for_dir(tmp.path().to_path_buf()),
    )
    .unwrap();

    let report = bridge.import_from_auto_memory().await.unwrap();
    assert_eq!(report.imported, 0);
    assert!(!report.errors.is_empty());
    assert!(report.errors[0].contains("bulk insert"));
}

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use automem::bridge::{AutoMemoryBridge, BridgeSettings, Category, Insight, SyncMode};
use automem::store::memory::MemoryStore;
use automem::store::{Store, StoreEntry, StoreQuery};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Bridge settings on a temp directory.
pub fn settings(dir: &Path, mode: SyncMode) -> BridgeSettings {
    let mut settings = BridgeSettings::for_dir(dir.to_path_buf());
    settings.sync_mode = mode;
    settings
}

/// Build a bridge over a fresh in-memory store.
pub fn bridge_on(dir: &Path, mode: SyncMode) -> (Arc<AutoMemoryBridge>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let bridge = AutoMemoryBridge::new(store.clone(), settings(dir, mode)).unwrap();
    (bridge, store)
}

/// An insight with the usual test provenance.
pub fn insight(category: Category, summary: &str, confidence: f64) -> Insight {
    Insight::new(category, summary, "agent:tester", confidence)
}

/// A learnings-namespace store entry the sync query will pick up.
pub fn learning_entry(
    key: &str,
    summary: &str,
    tags: &[&str],
    metadata: serde_json::Value,
) -> StoreEntry {
    StoreEntry::new(
        key,
        summary,
        "learnings",
        tags.iter().map(|t| t.to_string()).collect(),
        metadata,
    )
}

/// Store wrapper with switchable failure injection.
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_queries: AtomicBool,
    pub fail_bulk_insert: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_queries: AtomicBool::new(false),
            fail_bulk_insert: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn store(&self, entry: StoreEntry) -> Result<StoreEntry> {
        self.inner.store(entry).await
    }

    async fn bulk_insert(&self, entries: Vec<StoreEntry>) -> Result<()> {
        if self.fail_bulk_insert.load(Ordering::SeqCst) {
            anyhow::bail!("injected bulk insert failure");
        }
        self.inner.bulk_insert(entries).await
    }

    async fn query(&self, query: StoreQuery) -> Result<Vec<StoreEntry>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            anyhow::bail!("injected query failure");
        }
        self.inner.query(query).await
    }

    async fn get(&self, id: &str) -> Result<Option<StoreEntry>> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.inner.list_namespaces().await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

/// Read a file under the memory directory.
pub fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name))
        .unwrap_or_else(|e| panic!("failed to read {name}: {e}"))
}

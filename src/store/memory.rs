//! In-memory store backend for tests and ephemeral runs.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;

use super::{matches, Store, StoreEntry, StoreQuery};

/// A `Vec`-backed store behind a mutex. Query semantics match the SQLite
/// backend; ordering falls back to insertion order when no `order_by_desc`
/// is given.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<StoreEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn store(&self, mut entry: StoreEntry) -> Result<StoreEntry> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        if let Some(existing) = entries.iter_mut().find(|e| e.key == entry.key) {
            entry.id = existing.id.clone();
            entry.created_at = existing.created_at;
            entry.updated_at = chrono::Utc::now().timestamp_millis();
            *existing = entry.clone();
        } else {
            entries.push(entry.clone());
        }
        Ok(entry)
    }

    async fn bulk_insert(&self, new_entries: Vec<StoreEntry>) -> Result<()> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.extend(new_entries);
        Ok(())
    }

    async fn query(&self, query: StoreQuery) -> Result<Vec<StoreEntry>> {
        let entries = self.entries.lock().expect("store mutex poisoned");
        let mut hits: Vec<StoreEntry> = entries
            .iter()
            .filter(|e| matches(e, &query))
            .cloned()
            .collect();

        if let Some(field) = &query.order_by_desc {
            hits.sort_by(|a, b| {
                let fa = a.meta_f64(field).unwrap_or(f64::NEG_INFINITY);
                let fb = b.meta_f64(field).unwrap_or(f64::NEG_INFINITY);
                fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    async fn get(&self, id: &str) -> Result<Option<StoreEntry>> {
        let entries = self.entries.lock().expect("store mutex poisoned");
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() < before)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.lock().expect("store mutex poisoned").len() as u64)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().expect("store mutex poisoned");
        let namespaces: BTreeSet<String> =
            entries.iter().map(|e| e.namespace.clone()).collect();
        Ok(namespaces.into_iter().collect())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, ns: &str, confidence: f64) -> StoreEntry {
        StoreEntry::new(
            key,
            format!("content for {key}"),
            ns,
            vec!["insight".into()],
            json!({ "confidence": confidence }),
        )
    }

    #[tokio::test]
    async fn store_upserts_by_key() {
        let store = MemoryStore::new();
        let first = store.store(entry("k1", "learnings", 0.5)).await.unwrap();
        let second = store.store(entry("k1", "learnings", 0.9)).await.unwrap();

        assert_eq!(first.id, second.id, "upsert keeps the original id");
        assert_eq!(store.count().await.unwrap(), 1);

        let hits = store.query(StoreQuery::default()).await.unwrap();
        assert_eq!(hits[0].meta_f64("confidence"), Some(0.9));
    }

    #[tokio::test]
    async fn query_filters_compose() {
        let store = MemoryStore::new();
        store.store(entry("a", "learnings", 0.9)).await.unwrap();
        store.store(entry("b", "learnings", 0.3)).await.unwrap();
        store.store(entry("c", "other", 0.9)).await.unwrap();

        let hits = store
            .query(StoreQuery::default().namespace("learnings").min_confidence(0.5))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "a");
    }

    #[tokio::test]
    async fn query_orders_by_metadata_desc() {
        let store = MemoryStore::new();
        store.store(entry("low", "learnings", 0.2)).await.unwrap();
        store.store(entry("high", "learnings", 0.9)).await.unwrap();
        store.store(entry("mid", "learnings", 0.5)).await.unwrap();

        let hits = store
            .query(StoreQuery::default().order_by_desc("confidence").limit(2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key, "high");
        assert_eq!(hits[1].key, "mid");
    }

    #[tokio::test]
    async fn metadata_equality_filter() {
        let store = MemoryStore::new();
        let mut e = entry("hashed", "auto-memory", 0.5);
        e.metadata = json!({ "contentHash": "ab12cd34ef56ab12" });
        store.store(e).await.unwrap();

        let hits = store
            .query(StoreQuery::default().metadata_eq("contentHash", json!("ab12cd34ef56ab12")))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .query(StoreQuery::default().metadata_eq("contentHash", json!("0000000000000000")))
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn namespaces_and_delete() {
        let store = MemoryStore::new();
        let kept = store.store(entry("a", "learnings", 0.5)).await.unwrap();
        let gone = store.store(entry("b", "auto-memory", 0.5)).await.unwrap();

        assert_eq!(
            store.list_namespaces().await.unwrap(),
            vec!["auto-memory".to_string(), "learnings".to_string()]
        );

        assert!(store.delete(&gone.id).await.unwrap());
        assert!(!store.delete(&gone.id).await.unwrap());
        assert!(store.get(&kept.id).await.unwrap().is_some());
        assert!(store.get(&gone.id).await.unwrap().is_none());
    }
}

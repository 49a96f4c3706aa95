//! The structured memory store contract and its backends.
//!
//! The bridge treats the store as an abstract capability: upsert by key,
//! batch insert, and filtered queries. Anything satisfying [`Store`] is
//! pluggable; [`sqlite::SqliteStore`] is the persistent backend and
//! [`memory::MemoryStore`] the ephemeral one.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored entry. Metadata is free-form JSON; the bridge relies on the
/// `category`, `summary`, `confidence`, and `contentHash` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Caller-chosen unique key; `store` upserts on it.
    pub key: String,
    /// Full text content.
    pub content: String,
    /// Namespace partition (e.g. `"learnings"`, `"auto-memory"`).
    pub namespace: String,
    /// Flat tag list.
    pub tags: Vec<String>,
    /// Arbitrary JSON metadata.
    pub metadata: serde_json::Value,
    /// Creation time, wall-clock milliseconds.
    pub created_at: i64,
    /// Last-modification time, wall-clock milliseconds. Equals `created_at`
    /// on insert.
    pub updated_at: i64,
}

impl StoreEntry {
    /// Build an entry with fresh id and timestamps.
    pub fn new(
        key: impl Into<String>,
        content: impl Into<String>,
        namespace: impl Into<String>,
        tags: Vec<String>,
        metadata: serde_json::Value,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            key: key.into(),
            content: content.into(),
            namespace: namespace.into(),
            tags,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// String-valued metadata field, if present.
    pub fn meta_str(&self, field: &str) -> Option<&str> {
        self.metadata.get(field).and_then(serde_json::Value::as_str)
    }

    /// Float-valued metadata field, if present.
    pub fn meta_f64(&self, field: &str) -> Option<f64> {
        self.metadata.get(field).and_then(serde_json::Value::as_f64)
    }
}

/// Filter/order/limit spec for [`Store::query`].
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    pub namespace: Option<String>,
    /// Entry must carry this tag.
    pub tag: Option<String>,
    /// Metadata field equality, e.g. `("contentHash", json!("ab12..."))`.
    pub metadata_eq: Option<(String, serde_json::Value)>,
    /// Inclusive lower bound on the `confidence` metadata field.
    pub min_confidence: Option<f64>,
    /// Inclusive lower bound on `updated_at` (milliseconds).
    pub updated_since: Option<i64>,
    /// Metadata field to order by, descending.
    pub order_by_desc: Option<String>,
    pub limit: Option<usize>,
}

impl StoreQuery {
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn metadata_eq(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata_eq = Some((field.into(), value));
        self
    }

    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn updated_since(mut self, ms: i64) -> Self {
        self.updated_since = Some(ms);
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by_desc = Some(field.into());
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// The store capability consumed by the bridge (and surrounding tooling).
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or update by `key`. An existing key keeps its id and
    /// `created_at`; content, tags, metadata, and `updated_at` refresh.
    async fn store(&self, entry: StoreEntry) -> Result<StoreEntry>;

    /// Insert a batch of entries in one call.
    async fn bulk_insert(&self, entries: Vec<StoreEntry>) -> Result<()>;

    /// Entries matching every selector in `query`.
    async fn query(&self, query: StoreQuery) -> Result<Vec<StoreEntry>>;

    async fn get(&self, id: &str) -> Result<Option<StoreEntry>>;

    /// Returns `true` when an entry was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self) -> Result<u64>;

    async fn list_namespaces(&self) -> Result<Vec<String>>;

    async fn health_check(&self) -> Result<()>;
}

/// Query predicate for the in-memory backend. The SQLite backend encodes
/// the same semantics in SQL.
pub(crate) fn matches(entry: &StoreEntry, query: &StoreQuery) -> bool {
    if let Some(ns) = &query.namespace {
        if &entry.namespace != ns {
            return false;
        }
    }
    if let Some(tag) = &query.tag {
        if !entry.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if let Some((field, value)) = &query.metadata_eq {
        if entry.metadata.get(field) != Some(value) {
            return false;
        }
    }
    if let Some(min) = query.min_confidence {
        if entry.meta_f64("confidence").unwrap_or(0.0) < min {
            return false;
        }
    }
    if let Some(since) = query.updated_since {
        if entry.updated_at < since {
            return false;
        }
    }
    true
}

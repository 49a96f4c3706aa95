//! SQLite-backed store.
//!
//! One `entries` table with JSON columns for tags and metadata; filters run
//! through the JSON1 functions so query semantics match the in-memory
//! backend. Opened WAL-mode with a busy timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, types::Value as SqlValue, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

use super::{Store, StoreEntry, StoreQuery};

/// Persistent store backend. The connection lives behind a mutex; every
/// operation is short and never holds the lock across an await.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store database at `path`, with schema applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store database at {}", path.display()))?;

        // WAL for concurrent readers; wait on locks instead of failing.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", "5000")?;

        init_schema(&conn).context("failed to initialize store schema")?;

        tracing::debug!(path = %path.display(), "store database opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (tests, ephemeral use).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entries (
            id         TEXT PRIMARY KEY,
            key        TEXT NOT NULL UNIQUE,
            content    TEXT NOT NULL,
            namespace  TEXT NOT NULL,
            tags       TEXT NOT NULL,
            metadata   TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entries_namespace ON entries(namespace);
        CREATE INDEX IF NOT EXISTS idx_entries_updated_at ON entries(updated_at);",
    )?;
    Ok(())
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<StoreEntry> {
    let tags_json: String = row.get(4)?;
    let metadata_json: String = row.get(5)?;
    Ok(StoreEntry {
        id: row.get(0)?,
        key: row.get(1)?,
        content: row.get(2)?,
        namespace: row.get(3)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata_json)
            .unwrap_or(serde_json::Value::Null),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, key, content, namespace, tags, metadata, created_at, updated_at";

/// Bindable SQL value for a JSON metadata comparison.
fn json_param(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(SqlValue::Real)
            .unwrap_or(SqlValue::Null),
        serde_json::Value::Bool(b) => SqlValue::Integer(*b as i64),
        other => SqlValue::Text(other.to_string()),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn store(&self, entry: StoreEntry) -> Result<StoreEntry> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let tags_json = serde_json::to_string(&entry.tags)?;
        let metadata_json = serde_json::to_string(&entry.metadata)?;

        conn.execute(
            "INSERT INTO entries (id, key, content, namespace, tags, metadata, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(key) DO UPDATE SET \
               content = excluded.content, \
               namespace = excluded.namespace, \
               tags = excluded.tags, \
               metadata = excluded.metadata, \
               updated_at = excluded.updated_at",
            params![
                entry.id,
                entry.key,
                entry.content,
                entry.namespace,
                tags_json,
                metadata_json,
                entry.created_at,
                entry.updated_at,
            ],
        )?;

        // Re-read so an upsert hands back the surviving id and created_at.
        let stored = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM entries WHERE key = ?1"),
                params![entry.key],
                row_to_entry,
            )
            .context("stored entry not found after upsert")?;
        Ok(stored)
    }

    async fn bulk_insert(&self, entries: Vec<StoreEntry>) -> Result<()> {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (id, key, content, namespace, tags, metadata, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for entry in &entries {
                stmt.execute(params![
                    entry.id,
                    entry.key,
                    entry.content,
                    entry.namespace,
                    serde_json::to_string(&entry.tags)?,
                    serde_json::to_string(&entry.metadata)?,
                    entry.created_at,
                    entry.updated_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn query(&self, query: StoreQuery) -> Result<Vec<StoreEntry>> {
        let conn = self.conn.lock().expect("store mutex poisoned");

        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM entries");
        let mut clauses: Vec<String> = Vec::new();
        let mut bind: Vec<SqlValue> = Vec::new();

        if let Some(ns) = &query.namespace {
            bind.push(SqlValue::Text(ns.clone()));
            clauses.push(format!(
                "namespace = ?{}",
                bind.len()
            ));
        }
        if let Some(tag) = &query.tag {
            bind.push(SqlValue::Text(tag.clone()));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(entries.tags) WHERE json_each.value = ?{})",
                bind.len()
            ));
        }
        if let Some((field, value)) = &query.metadata_eq {
            bind.push(SqlValue::Text(format!("$.{field}")));
            let path_idx = bind.len();
            bind.push(json_param(value));
            clauses.push(format!(
                "json_extract(metadata, ?{path_idx}) = ?{}",
                bind.len()
            ));
        }
        if let Some(min) = query.min_confidence {
            bind.push(SqlValue::Real(min));
            clauses.push(format!(
                "CAST(json_extract(metadata, '$.confidence') AS REAL) >= ?{}",
                bind.len()
            ));
        }
        if let Some(since) = query.updated_since {
            bind.push(SqlValue::Integer(since));
            clauses.push(format!("updated_at >= ?{}", bind.len()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if let Some(field) = &query.order_by_desc {
            bind.push(SqlValue::Text(format!("$.{field}")));
            sql.push_str(&format!(
                " ORDER BY json_extract(metadata, ?{}) DESC",
                bind.len()
            ));
        } else {
            sql.push_str(" ORDER BY rowid");
        }
        if let Some(limit) = query.limit {
            bind.push(SqlValue::Integer(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", bind.len()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(rusqlite::params_from_iter(bind), row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn get(&self, id: &str) -> Result<Option<StoreEntry>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let entry = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM entries WHERE id = ?1"),
                params![id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let rows = conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT DISTINCT namespace FROM entries ORDER BY namespace")?;
        let namespaces = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(namespaces)
    }

    async fn health_check(&self) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let integrity: String =
            conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
        anyhow::ensure!(integrity == "ok", "store integrity check failed: {integrity}");
        Ok(())
    }
}

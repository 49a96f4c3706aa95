//! The bridge coordinator — public surface of the auto-memory bridge.
//!
//! [`AutoMemoryBridge`] owns the insight buffer, the session dedup set, the
//! periodic sync timer, the event emitter, and the store handle. All public
//! operations are async and yield only at I/O boundaries; concurrent syncs
//! serialize in call order behind an async gate.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::bridge::classify::classify;
use crate::bridge::dedup::{hash_content, SyncedKeys};
use crate::bridge::events::{BridgeEvent, EventEmitter};
use crate::bridge::index::{curate_index, INDEX_FILENAME};
use crate::bridge::paths::resolve_memory_dir;
use crate::bridge::topics::append_insight;
use crate::bridge::types::{
    Category, ImportReport, Insight, PruneStrategy, StatusReport, SyncMode, SyncReport,
};
use crate::store::{Store, StoreEntry, StoreQuery};

/// Namespace the bridge records insights into and syncs from.
const LEARNINGS_NAMESPACE: &str = "learnings";
/// Namespace imported markdown sections land in.
const AUTO_MEMORY_NAMESPACE: &str = "auto-memory";
/// Upper bound on store entries pulled per sync.
const SYNC_QUERY_LIMIT: usize = 50;

/// Validated construction settings for [`AutoMemoryBridge`].
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Absolute path of the per-project memory directory.
    pub memory_dir: PathBuf,
    pub sync_mode: SyncMode,
    /// Tick period for [`SyncMode::Periodic`].
    pub sync_interval_ms: u64,
    /// Store entries below this confidence are not pulled during sync.
    pub min_confidence: f64,
    pub max_index_lines: usize,
    pub max_topic_file_lines: usize,
    pub prune_strategy: PruneStrategy,
    /// Per-category topic filename overrides.
    pub topic_overrides: HashMap<Category, String>,
}

impl BridgeSettings {
    /// Defaults for an explicit memory directory.
    pub fn for_dir(memory_dir: impl Into<PathBuf>) -> Self {
        Self {
            memory_dir: memory_dir.into(),
            sync_mode: SyncMode::OnSessionEnd,
            sync_interval_ms: 300_000,
            min_confidence: 0.7,
            max_index_lines: 180,
            max_topic_file_lines: 100,
            prune_strategy: PruneStrategy::Fifo,
            topic_overrides: HashMap::new(),
        }
    }

    /// Defaults for a working directory, resolving the memory directory
    /// through the project-root derivation.
    pub fn for_working_dir(working_dir: &Path) -> Self {
        Self::for_dir(resolve_memory_dir(working_dir))
    }
}

/// State owned exclusively by the bridge.
struct BridgeState {
    /// Insights recorded but not yet flushed to topic files.
    buffer: Vec<Insight>,
    /// Store keys already written this session.
    synced_keys: SyncedKeys,
    /// Suffix guaranteeing key uniqueness within one millisecond.
    insight_counter: u64,
    /// Wall-clock ms of the last successful sync; 0 if never.
    last_sync_time: i64,
}

/// Bidirectional projection between the structured store and the
/// per-project markdown memory directory.
pub struct AutoMemoryBridge {
    store: Arc<dyn Store>,
    settings: BridgeSettings,
    state: Mutex<BridgeState>,
    /// Serializes whole sync runs in call order.
    sync_gate: Mutex<()>,
    events: EventEmitter,
    destroyed: AtomicBool,
    timer: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AutoMemoryBridge {
    /// Construct a bridge. Invalid settings fail here, not later: the
    /// memory directory must be absolute and periodic mode needs a nonzero
    /// interval.
    pub fn new(store: Arc<dyn Store>, settings: BridgeSettings) -> Result<Arc<Self>> {
        if !settings.memory_dir.is_absolute() {
            bail!(
                "memory directory must be an absolute path, got {}",
                settings.memory_dir.display()
            );
        }
        if settings.sync_mode == SyncMode::Periodic && settings.sync_interval_ms == 0 {
            bail!("periodic sync requires a nonzero interval");
        }

        let bridge = Arc::new(Self {
            store,
            settings,
            state: Mutex::new(BridgeState {
                buffer: Vec::new(),
                synced_keys: SyncedKeys::default(),
                insight_counter: 0,
                last_sync_time: 0,
            }),
            sync_gate: Mutex::new(()),
            events: EventEmitter::new(),
            destroyed: AtomicBool::new(false),
            timer: std::sync::Mutex::new(None),
        });

        if bridge.settings.sync_mode == SyncMode::Periodic {
            bridge.spawn_timer();
        }
        Ok(bridge)
    }

    fn spawn_timer(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = std::time::Duration::from_millis(self.settings.sync_interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so the first sync
            // happens one full period after construction.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(bridge) = weak.upgrade() else { break };
                // Failures already surface as events; the tick itself
                // never propagates them.
                if let Err(err) = bridge.sync_to_auto_memory().await {
                    tracing::debug!(error = %err, "periodic sync failed");
                }
            }
        });
        *self.timer.lock().expect("timer mutex poisoned") = Some(handle);
    }

    /// Subscribe to the bridge event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            bail!("bridge has been destroyed");
        }
        Ok(())
    }

    /// Accept an insight: clamp, upsert into the store, buffer, emit.
    ///
    /// In [`SyncMode::OnWrite`] the topic file and index are written before
    /// this returns. Returns the insight enriched with its store id.
    pub async fn record_insight(&self, mut insight: Insight) -> Result<Insight> {
        self.ensure_active()?;
        insight.confidence = insight.confidence.clamp(0.0, 1.0);

        let key = {
            let mut state = self.state.lock().await;
            let counter = state.insight_counter;
            state.insight_counter += 1;
            format!(
                "insight:{}:{}:{}",
                insight.category,
                chrono::Utc::now().timestamp_millis(),
                counter
            )
        };

        let entry = StoreEntry::new(
            key.clone(),
            insight.summary.clone(),
            LEARNINGS_NAMESPACE,
            vec!["insight".to_string(), insight.category.as_str().to_string()],
            serde_json::json!({
                "category": insight.category.as_str(),
                "summary": insight.summary,
                "confidence": insight.confidence,
                "contentHash": hash_content(&insight.summary),
                "source": insight.source,
            }),
        );
        let stored = self
            .store
            .store(entry)
            .await
            .context("failed to upsert insight into store")?;
        insight.store_id = Some(stored.id);

        {
            let mut state = self.state.lock().await;
            state.buffer.push(insight.clone());
            state.synced_keys.insert(key);
        }

        self.events.emit(BridgeEvent::InsightRecorded {
            insight: insight.clone(),
        });

        if self.settings.sync_mode == SyncMode::OnWrite {
            let path = self.get_topic_path(insight.category);
            append_insight(
                &path,
                insight.category.label(),
                &insight,
                self.settings.max_topic_file_lines,
            )
            .await?;
            self.curate_index_inner().await?;
        }

        Ok(insight)
    }

    /// Flush buffered insights and recent high-confidence store entries to
    /// the topic files, then regenerate the index.
    ///
    /// Per-file and store-query failures are captured into the report; only
    /// an uncreatable memory directory is fatal, and in that case the
    /// buffer survives for the next attempt.
    pub async fn sync_to_auto_memory(&self) -> Result<SyncReport> {
        self.ensure_active()?;
        let _gate = self.sync_gate.lock().await;
        let started = Instant::now();
        let start_ms = chrono::Utc::now().timestamp_millis();
        let mut report = SyncReport::default();

        if let Err(err) = tokio::fs::create_dir_all(&self.settings.memory_dir).await {
            self.events.emit(BridgeEvent::SyncFailed {
                error: err.to_string(),
                duration_ms: started.elapsed().as_millis() as u64,
            });
            return Err(err).with_context(|| {
                format!(
                    "failed to create memory directory {}",
                    self.settings.memory_dir.display()
                )
            });
        }

        // Snapshot-and-clear: insights recorded while this sync runs land
        // in the next sync's buffer.
        let (mut pending, last_sync) = {
            let mut state = self.state.lock().await;
            (std::mem::take(&mut state.buffer), state.last_sync_time)
        };

        let query = StoreQuery::default()
            .namespace(LEARNINGS_NAMESPACE)
            .min_confidence(self.settings.min_confidence)
            .updated_since(last_sync)
            .order_by_desc("confidence")
            .limit(SYNC_QUERY_LIMIT);
        match self.store.query(query).await {
            Ok(entries) => {
                let mut state = self.state.lock().await;
                for entry in entries {
                    if state.synced_keys.contains(&entry.key) {
                        continue;
                    }
                    state.synced_keys.insert(entry.key.clone());
                    pending.push(reconstruct_insight(&entry));
                }
            }
            Err(err) => {
                // Buffered insights still flush.
                report.errors.push(format!("store query failed: {err:#}"));
            }
        }

        let mut by_category: BTreeMap<Category, Vec<Insight>> = BTreeMap::new();
        for insight in pending {
            by_category.entry(insight.category).or_default().push(insight);
        }

        for (category, mut insights) in by_category {
            if self.settings.prune_strategy == PruneStrategy::ConfidenceWeighted {
                // Lowest confidence first, so the least-confident bullets
                // are the oldest and fall off first under pruning.
                insights.sort_by(|a, b| {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            report.categories.push(category.as_str().to_string());

            let path = self.get_topic_path(category);
            for insight in &insights {
                match append_insight(
                    &path,
                    category.label(),
                    insight,
                    self.settings.max_topic_file_lines,
                )
                .await
                {
                    Ok(true) => report.synced += 1,
                    Ok(false) => {}
                    Err(err) => report.errors.push(format!("{}: {err:#}", path.display())),
                }
            }
        }

        if let Err(err) = self.curate_index_inner().await {
            report.errors.push(format!("index curation failed: {err:#}"));
        }

        self.state.lock().await.last_sync_time = start_ms;

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.events.emit(BridgeEvent::SyncCompleted {
            report: report.clone(),
        });
        Ok(report)
    }

    /// Walk every `.md` file in the memory directory and batch-insert the
    /// sections whose content hash the store does not already hold.
    pub async fn import_from_auto_memory(&self) -> Result<ImportReport> {
        self.ensure_active()?;
        let started = Instant::now();
        let mut report = ImportReport::default();

        if !tokio::fs::try_exists(&self.settings.memory_dir)
            .await
            .unwrap_or(false)
        {
            self.events.emit(BridgeEvent::ImportCompleted {
                report: report.clone(),
            });
            return Ok(report);
        }

        let mut filenames = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.settings.memory_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to read memory directory {}",
                    self.settings.memory_dir.display()
                )
            })?;
        while let Some(dent) = dir.next_entry().await? {
            let name = dent.file_name().to_string_lossy().into_owned();
            if name.ends_with(".md") {
                filenames.push(name);
            }
        }
        filenames.sort();

        let mut candidates = Vec::new();
        for name in &filenames {
            report.files.push(name.clone());
            let content = match tokio::fs::read_to_string(self.settings.memory_dir.join(name)).await
            {
                Ok(content) => content,
                Err(err) => {
                    report.errors.push(format!("{name}: {err}"));
                    continue;
                }
            };

            let stem = name.strip_suffix(".md").unwrap_or(name);
            for section in crate::bridge::markdown::parse_markdown_entries(&content) {
                candidates.push(StoreEntry::new(
                    format!("auto-memory:{name}:{}", section.heading),
                    section.content.clone(),
                    AUTO_MEMORY_NAMESPACE,
                    vec!["auto-memory".to_string(), stem.to_string()],
                    serde_json::json!({
                        "heading": section.heading,
                        "contentHash": hash_content(&section.content),
                    }),
                ));
            }
        }

        if !candidates.is_empty() {
            match self
                .store
                .query(StoreQuery::default().namespace(AUTO_MEMORY_NAMESPACE))
                .await
            {
                Ok(existing) => {
                    let known: std::collections::HashSet<String> = existing
                        .iter()
                        .filter_map(|e| e.meta_str("contentHash"))
                        .map(str::to_string)
                        .collect();

                    let (skip, insert): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
                        c.meta_str("contentHash")
                            .is_some_and(|h| known.contains(h))
                    });
                    report.skipped = skip.len();

                    if !insert.is_empty() {
                        let count = insert.len();
                        match self.store.bulk_insert(insert).await {
                            Ok(()) => report.imported = count,
                            Err(err) => {
                                report.errors.push(format!("bulk insert failed: {err:#}"))
                            }
                        }
                    }
                }
                Err(err) => {
                    // Without the skip set a blind insert would duplicate;
                    // report and leave this batch for a later run.
                    report.errors.push(format!("store query failed: {err:#}"));
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.events.emit(BridgeEvent::ImportCompleted {
            report: report.clone(),
        });
        Ok(report)
    }

    /// Regenerate `MEMORY.md` from the topic files.
    pub async fn curate_index(&self) -> Result<usize> {
        self.ensure_active()?;
        self.curate_index_inner().await
    }

    async fn curate_index_inner(&self) -> Result<usize> {
        let lines = curate_index(
            &self.settings.memory_dir,
            &self.settings.topic_overrides,
            self.settings.max_index_lines,
        )
        .await?;
        self.events.emit(BridgeEvent::IndexCurated { lines });
        Ok(lines)
    }

    /// Snapshot of the on-disk and in-memory bridge state. Never errors:
    /// I/O failure reports a nonexistent directory instead.
    pub async fn get_status(&self) -> StatusReport {
        let state = self.state.lock().await;
        let mut report = StatusReport {
            exists: false,
            memory_dir: self.settings.memory_dir.clone(),
            files: Vec::new(),
            index_lines: 0,
            buffered_insights: state.buffer.len(),
            last_sync_time: state.last_sync_time,
        };
        drop(state);

        let Ok(mut dir) = tokio::fs::read_dir(&self.settings.memory_dir).await else {
            return report;
        };
        report.exists = true;
        while let Ok(Some(dent)) = dir.next_entry().await {
            let name = dent.file_name().to_string_lossy().into_owned();
            if name.ends_with(".md") {
                report.files.push(name);
            }
        }
        report.files.sort();

        if let Ok(index) = tokio::fs::read_to_string(self.get_index_path()).await {
            report.index_lines = index.lines().count();
        }
        report
    }

    /// Path of the index file.
    pub fn get_index_path(&self) -> PathBuf {
        self.settings.memory_dir.join(INDEX_FILENAME)
    }

    /// Path of a category's topic file, honoring overrides.
    pub fn get_topic_path(&self, category: Category) -> PathBuf {
        let filename = self
            .settings
            .topic_overrides
            .get(&category)
            .map(String::as_str)
            .unwrap_or_else(|| category.default_filename());
        self.settings.memory_dir.join(filename)
    }

    pub fn memory_dir(&self) -> &Path {
        &self.settings.memory_dir
    }

    /// Tear down: cancel the periodic timer and close the event stream.
    ///
    /// Safe to call more than once. An in-flight sync is not aborted; only
    /// future operations are refused.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.timer.lock().expect("timer mutex poisoned").take() {
            handle.abort();
        }
        self.events.close();
    }
}

impl Drop for AutoMemoryBridge {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.lock().expect("timer mutex poisoned").take() {
            handle.abort();
        }
    }
}

/// Rebuild an [`Insight`] from a store entry's metadata.
fn reconstruct_insight(entry: &StoreEntry) -> Insight {
    let summary = entry
        .meta_str("summary")
        .map(str::to_string)
        .unwrap_or_else(|| {
            entry
                .content
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        });
    Insight {
        category: classify(entry),
        summary,
        detail: None,
        source: entry
            .meta_str("source")
            .unwrap_or("memory-store")
            .to_string(),
        confidence: entry.meta_f64("confidence").unwrap_or(0.5).clamp(0.0, 1.0),
        store_id: Some(entry.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn bridge_on(dir: &Path) -> Arc<AutoMemoryBridge> {
        AutoMemoryBridge::new(
            Arc::new(MemoryStore::new()),
            BridgeSettings::for_dir(dir.to_path_buf()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn relative_memory_dir_is_rejected() {
        let result = AutoMemoryBridge::new(
            Arc::new(MemoryStore::new()),
            BridgeSettings::for_dir("relative/memory"),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn periodic_mode_needs_nonzero_interval() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = BridgeSettings::for_dir(tmp.path().to_path_buf());
        settings.sync_mode = SyncMode::Periodic;
        settings.sync_interval_ms = 0;
        let result = AutoMemoryBridge::new(Arc::new(MemoryStore::new()), settings);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn confidence_is_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        let bridge = bridge_on(tmp.path());

        let high = bridge
            .record_insight(Insight::new(Category::Debugging, "too confident", "t", 1.5))
            .await
            .unwrap();
        assert_eq!(high.confidence, 1.0);

        let low = bridge
            .record_insight(Insight::new(Category::Debugging, "not confident", "t", -0.2))
            .await
            .unwrap();
        assert_eq!(low.confidence, 0.0);
    }

    #[tokio::test]
    async fn record_sets_store_id_and_buffers() {
        let tmp = tempfile::tempdir().unwrap();
        let bridge = bridge_on(tmp.path());

        let insight = bridge
            .record_insight(Insight::new(Category::Security, "rotate the keys", "t", 0.9))
            .await
            .unwrap();
        assert!(insight.store_id.is_some());

        let status = bridge.get_status().await;
        assert_eq!(status.buffered_insights, 1);
        assert_eq!(status.last_sync_time, 0);
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_blocks_operations() {
        let tmp = tempfile::tempdir().unwrap();
        let bridge = bridge_on(&tmp.path().join("never-created"));

        bridge.destroy();
        bridge.destroy();

        let record = bridge
            .record_insight(Insight::new(Category::Debugging, "s", "t", 0.5))
            .await;
        assert!(record.is_err());
        assert!(bridge.sync_to_auto_memory().await.is_err());
        assert!(bridge.import_from_auto_memory().await.is_err());
        assert!(bridge.curate_index().await.is_err());

        // Status stays available for post-mortem inspection.
        let status = bridge.get_status().await;
        assert!(!status.exists);
        assert_eq!(status.buffered_insights, 0);
    }

    #[tokio::test]
    async fn topic_path_honors_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = BridgeSettings::for_dir(tmp.path().to_path_buf());
        settings
            .topic_overrides
            .insert(Category::Debugging, "bugs.md".to_string());
        let bridge = AutoMemoryBridge::new(Arc::new(MemoryStore::new()), settings).unwrap();

        assert!(bridge.get_topic_path(Category::Debugging).ends_with("bugs.md"));
        assert!(bridge.get_topic_path(Category::ProjectPatterns).ends_with("project-patterns.md"));
        assert!(bridge.get_index_path().ends_with("MEMORY.md"));
    }
}

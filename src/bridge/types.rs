//! Core bridge type definitions.
//!
//! Defines [`Category`] (the closed set of topic labels), [`Insight`] (a unit
//! of knowledge flowing through the bridge), the [`SyncMode`] and
//! [`PruneStrategy`] knobs, and the report structs returned by bridge
//! operations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The closed set of topic categories.
///
/// Every insight lands in exactly one of these; the classifier guarantees it
/// for store-origin entries and callers guarantee it for recorded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Conventions and recurring patterns observed in the project.
    ProjectPatterns,
    /// Root causes, fixes, and gotchas found while debugging.
    Debugging,
    /// Structural decisions and module relationships.
    Architecture,
    /// User and team preferences.
    Preferences,
    /// Measurements, bottlenecks, and tuning results.
    Performance,
    /// Vulnerabilities, hardening notes, and audit findings.
    Security,
    /// Outcomes reported by multi-agent swarm runs.
    SwarmResults,
}

impl Category {
    /// All categories, in the fixed order used for index sections.
    pub const ALL: [Category; 7] = [
        Category::ProjectPatterns,
        Category::Debugging,
        Category::Architecture,
        Category::Preferences,
        Category::Performance,
        Category::Security,
        Category::SwarmResults,
    ];

    /// Wire/file-naming representation (e.g. `"project-patterns"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectPatterns => "project-patterns",
            Self::Debugging => "debugging",
            Self::Architecture => "architecture",
            Self::Preferences => "preferences",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::SwarmResults => "swarm-results",
        }
    }

    /// Human-readable section label (e.g. `"Project Patterns"`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectPatterns => "Project Patterns",
            Self::Debugging => "Debugging",
            Self::Architecture => "Architecture",
            Self::Preferences => "Preferences",
            Self::Performance => "Performance",
            Self::Security => "Security",
            Self::SwarmResults => "Swarm Results",
        }
    }

    /// Default topic filename for this category (`<category>.md`).
    pub fn default_filename(&self) -> &'static str {
        match self {
            Self::ProjectPatterns => "project-patterns.md",
            Self::Debugging => "debugging.md",
            Self::Architecture => "architecture.md",
            Self::Preferences => "preferences.md",
            Self::Performance => "performance.md",
            Self::Security => "security.md",
            Self::SwarmResults => "swarm-results.md",
        }
    }

    /// Reverse lookup from a topic filename stem.
    ///
    /// `patterns` is accepted as a legacy stem for `project-patterns` so
    /// directories written under the older naming still curate correctly.
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        match stem {
            "patterns" => Some(Self::ProjectPatterns),
            other => other.parse().ok(),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project-patterns" => Ok(Self::ProjectPatterns),
            "debugging" => Ok(Self::Debugging),
            "architecture" => Ok(Self::Architecture),
            "preferences" => Ok(Self::Preferences),
            "performance" => Ok(Self::Performance),
            "security" => Ok(Self::Security),
            "swarm-results" => Ok(Self::SwarmResults),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// A single unit of knowledge flowing through the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Topic category; classification guarantees membership in the closed set.
    pub category: Category,
    /// One-line statement. Dedup identity in the markdown representation.
    pub summary: String,
    /// Optional multi-line elaboration. Single-line details stay store-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Provenance (e.g. `"agent:tester"`, `"swarm:<id>:<role>"`).
    pub source: String,
    /// Confidence in `[0.0, 1.0]`; out-of-range values are clamped on record.
    pub confidence: f64,
    /// Cross-reference to the store entry, set once the insight is upserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

impl Insight {
    /// Convenience constructor for the common no-detail case.
    pub fn new(category: Category, summary: impl Into<String>, source: impl Into<String>, confidence: f64) -> Self {
        Self {
            category,
            summary: summary.into(),
            detail: None,
            source: source.into(),
            confidence,
            store_id: None,
        }
    }
}

/// When topic files and the index are (re)written relative to recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Every `record_insight` writes the topic file and index immediately.
    OnWrite,
    /// Insights buffer until the caller syncs explicitly.
    OnSessionEnd,
    /// A background timer syncs every `sync_interval_ms`.
    Periodic,
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on-write" => Ok(Self::OnWrite),
            "on-session-end" => Ok(Self::OnSessionEnd),
            "periodic" => Ok(Self::Periodic),
            _ => Err(format!("unknown sync mode: {s}")),
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::OnWrite => "on-write",
            Self::OnSessionEnd => "on-session-end",
            Self::Periodic => "periodic",
        })
    }
}

/// Which bullets fall off first when a file exceeds its line budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PruneStrategy {
    /// Oldest bullets first.
    Fifo,
    /// Treated identically to fifo (access order is not tracked on disk).
    Lru,
    /// Orders a category's bullets by ascending confidence at sync time so
    /// the least-confident age out first; degrades to fifo at curate time.
    ConfidenceWeighted,
}

impl std::str::FromStr for PruneStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Self::Fifo),
            "lru" => Ok(Self::Lru),
            "confidence-weighted" => Ok(Self::ConfidenceWeighted),
            _ => Err(format!("unknown prune strategy: {s}")),
        }
    }
}

/// Result of one `sync_to_auto_memory` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Insights written to topic files (buffered + store-queried).
    pub synced: usize,
    /// Categories that received at least one write attempt.
    pub categories: Vec<String>,
    /// Per-file and store-query failures; never aborts the whole sync.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Result of one `import_from_auto_memory` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Sections inserted into the store.
    pub imported: usize,
    /// Sections skipped because their content hash already exists.
    pub skipped: usize,
    /// Every `.md` file visited, including ones with no sections.
    pub files: Vec<String>,
    /// Per-file read failures and batch-insert failures.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Snapshot returned by `get_status`; never errors.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Whether the memory directory exists on disk.
    pub exists: bool,
    pub memory_dir: PathBuf,
    /// Markdown files present in the directory.
    pub files: Vec<String>,
    /// Line count of `MEMORY.md`, 0 if absent.
    pub index_lines: usize,
    /// Insights recorded but not yet flushed.
    pub buffered_insights: usize,
    /// Wall-clock ms of the last successful sync; 0 if never.
    pub last_sync_time: i64,
}

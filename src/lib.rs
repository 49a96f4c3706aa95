//! Bidirectional bridge between a structured memory store and the
//! human-readable, per-project markdown memory an agent runtime reads at
//! session start.
//!
//! Insights recorded through the bridge land in two places: the queryable
//! [`store`] (tagged, hashed, confidence-scored) and a tree of markdown
//! topic files under `<home>/.claude/projects/<key>/memory/`, digested into
//! a line-capped `MEMORY.md` index. The bridge keeps both representations
//! consistent — content-hashed dedup across the boundary, bounded index
//! size, serialized file writes, and per-file failure isolation.
//!
//! # Architecture
//!
//! - **Bridge**: buffer + sync modes (`on-write`, `on-session-end`,
//!   `periodic`), topic classification, line-budget pruning, a typed event
//!   stream over a broadcast channel
//! - **Store**: pluggable [`store::Store`] trait; SQLite (WAL, JSON1
//!   metadata filters) or in-memory backends
//! - **Markdown**: `# Label` topic files with bullet-per-insight lines and
//!   a fixed-title curated index
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`bridge`] — Path resolution, markdown codec, dedup, classification,
//!   topic writes, index curation, and the coordinator
//! - [`store`] — The store contract and its SQLite / in-memory backends

pub mod bridge;
pub mod config;
pub mod store;

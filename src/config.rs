use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::bridge::types::Category;
use crate::bridge::{BridgeSettings, PruneStrategy, SyncMode};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AutomemConfig {
    pub bridge: BridgeConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
    /// Per-category topic filename overrides, e.g. `debugging = "bugs.md"`.
    pub topics: HashMap<String, String>,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub sync_mode: String,
    pub sync_interval_ms: u64,
    pub min_confidence: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_index_lines: usize,
    pub max_topic_file_lines: usize,
    pub prune_strategy: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for AutomemConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            limits: LimitsConfig::default(),
            storage: StorageConfig::default(),
            topics: HashMap::new(),
            log_level: "info".into(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sync_mode: "on-session-end".into(),
            sync_interval_ms: 300_000,
            min_confidence: 0.7,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_index_lines: 180,
            max_topic_file_lines: 100,
            prune_strategy: "fifo".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_automem_dir()
            .join("store.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

/// Returns `~/.automem/`
pub fn default_automem_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".automem")
}

/// Returns the default config file path: `~/.automem/config.toml`
pub fn default_config_path() -> PathBuf {
    default_automem_dir().join("config.toml")
}

impl AutomemConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AutomemConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (AUTOMEM_DB, AUTOMEM_SYNC_MODE,
    /// AUTOMEM_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AUTOMEM_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("AUTOMEM_SYNC_MODE") {
            self.bridge.sync_mode = val;
        }
        if let Ok(val) = std::env::var("AUTOMEM_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Validate and convert into bridge settings for a working directory.
    ///
    /// Unknown sync modes, prune strategies, or category names fail here so
    /// the bridge never sees them.
    pub fn bridge_settings(&self, working_dir: &Path) -> Result<BridgeSettings> {
        let sync_mode: SyncMode = self
            .bridge
            .sync_mode
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let prune_strategy: PruneStrategy = self
            .limits
            .prune_strategy
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        let mut topic_overrides = HashMap::new();
        for (category, filename) in &self.topics {
            let category: Category = category
                .parse()
                .map_err(|e: String| anyhow::anyhow!("invalid topic override: {e}"))?;
            topic_overrides.insert(category, filename.clone());
        }

        let mut settings = BridgeSettings::for_working_dir(working_dir);
        settings.sync_mode = sync_mode;
        settings.sync_interval_ms = self.bridge.sync_interval_ms;
        settings.min_confidence = self.bridge.min_confidence;
        settings.max_index_lines = self.limits.max_index_lines;
        settings.max_topic_file_lines = self.limits.max_topic_file_lines;
        settings.prune_strategy = prune_strategy;
        settings.topic_overrides = topic_overrides;
        Ok(settings)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Whether the consumer-side disable flag is set.
///
/// `CLAUDE_CODE_DISABLE_AUTO_MEMORY` set to anything other than `0`
/// disables the auto-memory surface. The bridge itself never reads this;
/// it is a contract for callers like the CLI.
pub fn auto_memory_disabled() -> bool {
    match std::env::var("CLAUDE_CODE_DISABLE_AUTO_MEMORY") {
        Ok(val) => val != "0",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AutomemConfig::default();
        assert_eq!(config.bridge.sync_mode, "on-session-end");
        assert_eq!(config.limits.max_index_lines, 180);
        assert_eq!(config.limits.prune_strategy, "fifo");
        assert!(config.storage.db_path.ends_with("store.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
log_level = "debug"

[bridge]
sync_mode = "periodic"
sync_interval_ms = 60000

[limits]
max_index_lines = 120

[topics]
debugging = "bugs.md"
"#;
        let config: AutomemConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bridge.sync_mode, "periodic");
        assert_eq!(config.bridge.sync_interval_ms, 60_000);
        assert_eq!(config.limits.max_index_lines, 120);
        assert_eq!(config.topics["debugging"], "bugs.md");
        // defaults still apply for unset fields
        assert_eq!(config.limits.max_topic_file_lines, 100);
        assert!((config.bridge.min_confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn bridge_settings_validate_enums() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AutomemConfig::default();
        config.bridge.sync_mode = "sometimes".into();
        assert!(config.bridge_settings(tmp.path()).is_err());

        config.bridge.sync_mode = "on-write".into();
        config.limits.prune_strategy = "newest-first".into();
        assert!(config.bridge_settings(tmp.path()).is_err());

        config.limits.prune_strategy = "confidence-weighted".into();
        let settings = config.bridge_settings(tmp.path()).unwrap();
        assert_eq!(settings.sync_mode, SyncMode::OnWrite);
        assert_eq!(settings.prune_strategy, PruneStrategy::ConfidenceWeighted);
    }

    #[test]
    fn bridge_settings_reject_unknown_topic_category() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AutomemConfig::default();
        config.topics.insert("musings".into(), "musings.md".into());
        assert!(config.bridge_settings(tmp.path()).is_err());
    }
}

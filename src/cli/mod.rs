pub mod curate;
pub mod import;
pub mod record;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::AutoMemoryBridge;
use crate::config::AutomemConfig;
use crate::store::sqlite::SqliteStore;

/// Open the configured SQLite store and build a bridge rooted at the
/// current working directory.
pub fn build_bridge(config: &AutomemConfig) -> Result<Arc<AutoMemoryBridge>> {
    let store = SqliteStore::open(config.resolved_db_path())?;
    let working_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let settings = config.bridge_settings(&working_dir)?;
    AutoMemoryBridge::new(Arc::new(store), settings)
}

/// Spinner for the long-running subcommands.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

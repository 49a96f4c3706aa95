use anyhow::Result;

use crate::config::AutomemConfig;

/// Flush buffered insights and recent store learnings to the topic files,
/// then regenerate the index.
pub async fn sync(config: &AutomemConfig) -> Result<()> {
    let bridge = super::build_bridge(config)?;

    let pb = super::spinner("Syncing to auto-memory...");
    let report = bridge.sync_to_auto_memory().await;
    pb.finish_and_clear();
    let report = report?;

    println!("Sync complete:");
    println!("  Insights written: {}", report.synced);
    if !report.categories.is_empty() {
        println!("  Categories:       {}", report.categories.join(", "));
    }
    println!("  Duration:         {}ms", report.duration_ms);
    for error in &report.errors {
        eprintln!("Warning: {error}");
    }

    bridge.destroy();
    Ok(())
}

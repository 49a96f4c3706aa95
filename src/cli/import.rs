use anyhow::Result;

use crate::config::AutomemConfig;

/// Import markdown sections from the memory directory into the store,
/// skipping sections whose content hash is already present.
pub async fn import(config: &AutomemConfig) -> Result<()> {
    let bridge = super::build_bridge(config)?;

    let pb = super::spinner("Importing from auto-memory...");
    let report = bridge.import_from_auto_memory().await;
    pb.finish_and_clear();
    let report = report?;

    println!("Import complete:");
    println!("  Sections imported: {}", report.imported);
    println!("  Sections skipped:  {} (already in store)", report.skipped);
    println!("  Files visited:     {}", report.files.len());
    for error in &report.errors {
        eprintln!("Warning: {error}");
    }

    bridge.destroy();
    Ok(())
}

use anyhow::Result;

use crate::config::AutomemConfig;

/// Print the memory directory state and bridge counters.
pub async fn status(config: &AutomemConfig) -> Result<()> {
    let bridge = super::build_bridge(config)?;
    let report = bridge.get_status().await;

    println!("Memory directory: {}", report.memory_dir.display());
    println!("  Exists:            {}", if report.exists { "yes" } else { "no" });
    if !report.files.is_empty() {
        println!("  Files:             {}", report.files.join(", "));
    }
    println!("  Index lines:       {}", report.index_lines);
    println!("  Buffered insights: {}", report.buffered_insights);
    if report.last_sync_time > 0 {
        println!("  Last sync (ms):    {}", report.last_sync_time);
    } else {
        println!("  Last sync:         never");
    }

    bridge.destroy();
    Ok(())
}

use anyhow::Result;

use crate::config::AutomemConfig;

/// Regenerate `MEMORY.md` from the topic files.
pub async fn curate(config: &AutomemConfig) -> Result<()> {
    let bridge = super::build_bridge(config)?;

    let lines = bridge.curate_index().await?;
    println!("Index curated: {} lines at {}", lines, bridge.get_index_path().display());

    bridge.destroy();
    Ok(())
}

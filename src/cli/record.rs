use anyhow::Result;

use crate::bridge::{Category, Insight};
use crate::config::AutomemConfig;

/// Record a single insight from the command line.
pub async fn record(
    config: &AutomemConfig,
    summary: &str,
    category: Category,
    source: &str,
    confidence: f64,
    detail: Option<String>,
) -> Result<()> {
    let bridge = super::build_bridge(config)?;

    let mut insight = Insight::new(category, summary, source, confidence);
    insight.detail = detail;
    let recorded = bridge.record_insight(insight).await?;

    println!(
        "Recorded {} insight (conf: {:.2}): {}",
        recorded.category, recorded.confidence, recorded.summary
    );

    // A one-shot CLI invocation has no session end; flush now so the
    // insight is visible to the next agent session.
    let report = bridge.sync_to_auto_memory().await?;
    for error in &report.errors {
        eprintln!("Warning: {error}");
    }

    bridge.destroy();
    Ok(())
}

mod bridge;
mod cli;
mod config;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::bridge::Category;

#[derive(Parser)]
#[command(name = "automem", version, about = "Bridge between the memory store and per-project markdown memory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the memory directory state and bridge counters
    Status,
    /// Flush buffered insights and recent learnings to markdown, then curate the index
    Sync,
    /// Import markdown sections from the memory directory into the store
    Import,
    /// Regenerate MEMORY.md from the topic files
    Curate,
    /// Record one insight and sync it immediately
    Record {
        /// One-line insight summary
        summary: String,
        /// Topic category
        #[arg(long, default_value = "project-patterns")]
        category: String,
        /// Provenance string (e.g. agent:tester)
        #[arg(long, default_value = "cli")]
        source: String,
        /// Confidence in [0, 1]; out-of-range values are clamped
        #[arg(long, default_value_t = 0.8)]
        confidence: f64,
        /// Optional multi-line elaboration
        #[arg(long)]
        detail: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::AutomemConfig::load()?;

    // Log to stderr so stdout stays clean for report output.
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if config::auto_memory_disabled() {
        eprintln!("auto-memory is disabled (CLAUDE_CODE_DISABLE_AUTO_MEMORY is set)");
        return Ok(());
    }

    match cli.command {
        Command::Status => cli::status::status(&config).await?,
        Command::Sync => cli::sync::sync(&config).await?,
        Command::Import => cli::import::import(&config).await?,
        Command::Curate => cli::curate::curate(&config).await?,
        Command::Record {
            summary,
            category,
            source,
            confidence,
            detail,
        } => {
            let category: Category = category
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            cli::record::record(&config, &summary, category, &source, confidence, detail).await?;
        }
    }

    Ok(())
}

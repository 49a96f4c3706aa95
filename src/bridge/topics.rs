//! Topic file writes — append, header creation, and line-budget pruning.

use anyhow::{Context, Result};
use std::path::Path;

use crate::bridge::dedup::has_summary_line;
use crate::bridge::markdown::format_insight_line;
use crate::bridge::types::Insight;

/// Append one insight to a topic file.
///
/// Creates the file with a `# <Label>` header when missing. Returns
/// `Ok(false)` without writing when the summary already exists as a bullet.
/// Files that grow past `max_lines` are pruned oldest-first.
pub async fn append_insight(
    path: &Path,
    label: &str,
    insight: &Insight,
    max_lines: usize,
) -> Result<bool> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut content = match tokio::fs::read_to_string(path).await {
        Ok(existing) => existing,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            format!("# {label}\n\n")
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    if has_summary_line(&content, &insight.summary) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&format_insight_line(insight));
    content.push('\n');

    if content.lines().count() > max_lines {
        content = prune_topic_file(&content, max_lines);
    }

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Drop the oldest bullets until `content` fits in `max_lines`.
///
/// The header block — everything above the first bullet, including the `#`
/// line, blank lines, and prose — is preserved verbatim. A bullet moves
/// together with its indented continuation lines. Content already within
/// budget is returned unchanged.
pub fn prune_topic_file(content: &str, max_lines: usize) -> String {
    if content.lines().count() <= max_lines {
        return content.to_string();
    }

    let lines: Vec<&str> = content.lines().collect();
    let first_bullet = lines
        .iter()
        .position(|l| l.starts_with("- "))
        .unwrap_or(lines.len());
    let (header, body) = lines.split_at(first_bullet);

    // Group each bullet with its continuation lines.
    let mut entries: Vec<Vec<&str>> = Vec::new();
    for line in body {
        if line.starts_with("- ") || entries.is_empty() {
            entries.push(vec![line]);
        } else {
            entries.last_mut().expect("entries is non-empty").push(line);
        }
    }

    let mut total = lines.len();
    let mut dropped = 0;
    while total > max_lines && dropped < entries.len() {
        total -= entries[dropped].len();
        dropped += 1;
    }

    let mut kept: Vec<&str> = header.to_vec();
    for entry in &entries[dropped..] {
        kept.extend_from_slice(entry);
    }

    let mut result = kept.join("\n");
    result.push('\n');
    result
}

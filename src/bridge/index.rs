//! Index curation — the bounded `MEMORY.md` digest of topic files.
//!
//! The external runtime loads only the first lines of the index, so the
//! total line count must stay within the configured cap. Pruning drops the
//! oldest bullets first and runs on a decremented counter, never a
//! rebuild-and-measure loop.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::bridge::markdown::extract_summaries;
use crate::bridge::types::Category;

/// Fixed title line of the index file.
pub const INDEX_TITLE: &str = "# Claude Flow V3 Project Memory";

/// Name of the index file; uppercase by contract.
pub const INDEX_FILENAME: &str = "MEMORY.md";

/// Regenerate `MEMORY.md` from the topic files in `memory_dir`.
///
/// Every `*.md` file except the index contributes its bullet summaries
/// (metadata stripped) under the category its filename maps to; files that
/// map to no known category get their own section labeled by the filename
/// stem. Returns the emitted line count.
pub async fn curate_index(
    memory_dir: &Path,
    mapping: &HashMap<Category, String>,
    max_lines: usize,
) -> Result<usize> {
    tokio::fs::create_dir_all(memory_dir)
        .await
        .with_context(|| format!("failed to create directory {}", memory_dir.display()))?;

    let mut filenames = Vec::new();
    let mut dir = tokio::fs::read_dir(memory_dir)
        .await
        .with_context(|| format!("failed to read directory {}", memory_dir.display()))?;
    while let Some(dent) = dir.next_entry().await? {
        let name = dent.file_name().to_string_lossy().into_owned();
        if name.ends_with(".md") && name != INDEX_FILENAME {
            filenames.push(name);
        }
    }
    // Directory iteration order is OS-dependent; sorted input keeps the
    // curated output deterministic across runs.
    filenames.sort();

    let mut by_label: Vec<(String, Vec<String>)> = Vec::new();
    let mut label_slots: HashMap<String, usize> = HashMap::new();
    for category in Category::ALL {
        label_slots.insert(category.label().to_string(), by_label.len());
        by_label.push((category.label().to_string(), Vec::new()));
    }

    for name in &filenames {
        let content = match tokio::fs::read_to_string(memory_dir.join(name)).await {
            Ok(c) => c,
            Err(_) => continue,
        };
        let summaries = extract_summaries(&content);
        if summaries.is_empty() {
            continue;
        }

        let label = label_for_file(name, mapping);
        let slot = *label_slots.entry(label.clone()).or_insert_with(|| {
            by_label.push((label, Vec::new()));
            by_label.len() - 1
        });
        by_label[slot].1.extend(summaries);
    }

    let groups: Vec<(String, Vec<String>)> =
        by_label.into_iter().filter(|(_, s)| !s.is_empty()).collect();

    let index = build_index(groups, max_lines);
    let lines = index.lines().count();

    tokio::fs::write(memory_dir.join(INDEX_FILENAME), index)
        .await
        .with_context(|| format!("failed to write {}", memory_dir.join(INDEX_FILENAME).display()))?;
    Ok(lines)
}

/// Section label for a topic filename: explicit mapping override first,
/// then the built-in category filenames, then the stem itself.
fn label_for_file(filename: &str, mapping: &HashMap<Category, String>) -> String {
    if let Some((category, _)) = mapping.iter().find(|(_, f)| f.as_str() == filename) {
        return category.label().to_string();
    }
    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    match Category::from_file_stem(stem) {
        Some(category) => category.label().to_string(),
        None => stem.to_string(),
    }
}

/// Serialize grouped summaries into the index document, pruning to
/// `max_lines` first.
///
/// Pruning removes the oldest bullet of the currently largest section
/// (earlier section on ties) and drops sections that empty out, tracking
/// the projected line count as it goes.
pub fn build_index(mut groups: Vec<(String, Vec<String>)>, max_lines: usize) -> String {
    // One title line, then per section: separator blank + header + blank +
    // bullets. Kept in lockstep with the serialization below.
    let mut total = 1 + groups.iter().map(|(_, s)| s.len() + 3).sum::<usize>();

    while total > max_lines {
        // Oldest bullet of the currently largest section goes first; ties
        // favor the earlier section.
        let mut largest: Option<usize> = None;
        for (i, (_, summaries)) in groups.iter().enumerate() {
            let bigger = match largest {
                Some(j) => summaries.len() > groups[j].1.len(),
                None => !summaries.is_empty(),
            };
            if bigger {
                largest = Some(i);
            }
        }
        let Some(largest) = largest else { break };

        groups[largest].1.remove(0);
        total -= 1;
        if groups[largest].1.is_empty() {
            groups.remove(largest);
            total -= 3;
        }
    }

    let mut out = String::from(INDEX_TITLE);
    out.push('\n');
    for (label, summaries) in &groups {
        out.push('\n');
        out.push_str("## ");
        out.push_str(label);
        out.push('\n');
        out.push('\n');
        for summary in summaries {
            out.push_str("- ");
            out.push_str(summary);
            out.push('\n');
        }
    }
    out
}

//! Store entry classification into the closed topic set.

use crate::bridge::types::Category;
use crate::store::StoreEntry;

/// Map a store entry to a topic category.
///
/// Precedence: a valid `metadata.category`, then the first tag that names a
/// category or a known alias, then the `project-patterns` default bucket.
pub fn classify(entry: &StoreEntry) -> Category {
    if let Some(category) = entry.meta_str("category").and_then(|c| c.parse().ok()) {
        return category;
    }

    for tag in &entry.tags {
        if let Some(category) = tag_category(tag) {
            return category;
        }
    }

    Category::ProjectPatterns
}

fn tag_category(tag: &str) -> Option<Category> {
    if let Ok(category) = tag.parse() {
        return Some(category);
    }
    match tag {
        "bug" => Some(Category::Debugging),
        "swarm" | "agent" => Some(Category::SwarmResults),
        "perf" | "benchmark" => Some(Category::Performance),
        _ => None,
    }
}

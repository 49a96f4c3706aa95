//! Content-hash and bullet-prefix deduplication.
//!
//! Two layers keep the store and the topic files from double-recording an
//! insight: a truncated SHA-256 over the canonical text (the cross-boundary
//! dedup key) and a bounded set of store keys already written this session.

use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};

/// First sixteen hex digits of SHA-256 over `text`.
///
/// A dedup key, not a MAC; the truncation keeps collision probability
/// negligible at this scale while staying grep-friendly in metadata.
pub fn hash_content(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// True when `summary` already exists as a bullet in `content`.
///
/// Matches the bullet's text after `- ` as a prefix whose tail is empty,
/// whitespace, or the ` _(...)_` metadata suffix. A summary that appears
/// only inside a longer bullet does not match.
pub fn has_summary_line(content: &str, summary: &str) -> bool {
    content.lines().any(|line| {
        let Some(rest) = line.strip_prefix("- ") else {
            return false;
        };
        let Some(tail) = rest.strip_prefix(summary) else {
            return false;
        };
        tail.is_empty() || tail.chars().all(char::is_whitespace) || tail.trim_start().starts_with("_(")
    })
}

/// Insertion-ordered set of store keys written this session.
///
/// Bounded: once `capacity` keys are held, inserting a new key evicts the
/// oldest. Eviction is acceptable because the topic files themselves still
/// carry the bullet-prefix dedup check.
#[derive(Debug)]
pub struct SyncedKeys {
    set: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SyncedKeys {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.set.contains(key)
    }

    /// Insert a key, evicting the oldest when at capacity.
    ///
    /// Returns `false` when the key was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.set.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(key.clone());
        self.order.push_back(key);
        true
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for SyncedKeys {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_16_hex() {
        let a = hash_content("HNSW index requires initialization");
        let b = hash_content("HNSW index requires initialization");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_differs_on_different_input() {
        assert_ne!(hash_content("alpha"), hash_content("beta"));
    }

    #[test]
    fn summary_line_exact_match() {
        let content = "# Debugging\n\n- Use Int8 quantization\n";
        assert!(has_summary_line(content, "Use Int8 quantization"));
    }

    #[test]
    fn summary_line_with_metadata_suffix() {
        let content = "- Use Int8 quantization _(agent:perf, 2026-01-01, conf: 0.80)_\n";
        assert!(has_summary_line(content, "Use Int8 quantization"));
    }

    #[test]
    fn summary_substring_does_not_match() {
        // Prefix of the bullet text, not a substring of the whole line.
        let content = "- Do not use Int8 quantization on the hot path\n";
        assert!(!has_summary_line(content, "Use Int8"));
        // A longer bullet that merely starts with the summary words plus
        // more text is not a match either.
        let content = "- Use Int8 carefully\n";
        assert!(!has_summary_line(content, "Use Int8"));
    }

    #[test]
    fn summary_match_is_case_sensitive() {
        let content = "- Use Int8 quantization\n";
        assert!(!has_summary_line(content, "use int8 quantization"));
    }

    #[test]
    fn synced_keys_evicts_oldest_at_capacity() {
        let mut keys = SyncedKeys::new(3);
        assert!(keys.insert("a"));
        assert!(keys.insert("b"));
        assert!(keys.insert("c"));
        assert!(!keys.insert("a"), "duplicate insert reports false");

        assert!(keys.insert("d"));
        assert_eq!(keys.len(), 3);
        assert!(!keys.contains("a"), "oldest key evicted");
        assert!(keys.contains("d"));
    }
}

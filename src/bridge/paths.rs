//! Per-project memory directory resolution.
//!
//! The memory directory for a working directory is derived from the
//! containing repository root: `<home>/.claude/projects/<key>/memory`, where
//! `<key>` is the root path with separators flattened to `-`. Pure functions;
//! nothing here touches the filesystem beyond reading directory entries.

use std::path::{Path, PathBuf};

/// Walk up from `dir` until a directory containing a `.git` entry is found.
///
/// Returns `None` when the traversal reaches the filesystem root without
/// finding one.
pub fn find_git_root(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .find(|candidate| candidate.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Flatten a path into a stable per-project key.
///
/// Every path separator becomes `-` and a leading `-` is stripped, so
/// `/home/user/proj` keys as `home-user-proj`.
pub fn project_key(path: &Path) -> String {
    let flattened: String = path
        .to_string_lossy()
        .chars()
        .map(|c| if c == std::path::MAIN_SEPARATOR || c == '/' { '-' } else { c })
        .collect();
    flattened.trim_start_matches('-').to_string()
}

/// Compute the memory directory for a working directory.
///
/// Uses the git root when one exists, otherwise the working directory
/// verbatim, then joins under `<home>/.claude/projects/<key>/memory`.
pub fn resolve_memory_dir(working_dir: &Path) -> PathBuf {
    let project_root = find_git_root(working_dir).unwrap_or_else(|| working_dir.to_path_buf());
    let key = project_key(&project_root);
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".claude")
        .join("projects")
        .join(key)
        .join("memory")
}

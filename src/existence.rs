//! Local artifact detection
//!
//! Artifacts are named `{object_id}_{original_name}`, so the object id prefix
//! is enough to find an earlier download of the same message regardless of
//! what the file was called.

use std::path::{Path, PathBuf};

/// What the checker found for an object id
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExistingArtifact {
    /// Whether a matching regular file exists
    pub found: bool,
    /// Its path (empty when not found)
    pub path: PathBuf,
    /// Its size in bytes (0 when not found)
    pub size: u64,
}

impl ExistingArtifact {
    /// Complete when sizes match, or when the expected size is unknown (0)
    pub fn is_complete(&self, expected_size: u64) -> bool {
        self.found && (expected_size == 0 || self.size == expected_size)
    }
}

/// Look for a regular file named `"{object_id}_*"` directly inside `dir`
///
/// Synchronous and side-effect-free. A missing or unreadable directory reports
/// nothing found. When several files match, the largest wins so a finished
/// copy is preferred over a stale partial.
pub fn find_existing(dir: &Path, object_id: i64) -> ExistingArtifact {
    let prefix = format!("{}_", object_id);

    let Ok(entries) = std::fs::read_dir(dir) else {
        return ExistingArtifact::default();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file().then(|| ExistingArtifact {
                found: true,
                path: entry.path(),
                size: meta.len(),
            })
        })
        .max_by_key(|artifact| artifact.size)
        .unwrap_or_default()
}

/// Re-download policy knobs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedownloadPolicy {
    /// Treat a complete existing artifact as done
    pub skip_existing: bool,
    /// Delete whatever exists and transfer unconditionally
    pub force_redownload: bool,
}

/// What a task should do with what is on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Nothing usable exists; transfer
    Transfer,
    /// A complete artifact exists; record it and transfer nothing
    Skip(PathBuf),
    /// A partial artifact exists; delete it, then transfer
    RemoveStaleAndTransfer(PathBuf),
    /// Forced: delete this artifact, then transfer
    ForceRedownload(PathBuf),
}

/// Decide between skip, resume-from-scratch and forced re-fetch
pub fn decide(existing: &ExistingArtifact, expected_size: u64, policy: RedownloadPolicy) -> Action {
    if !existing.found {
        return Action::Transfer;
    }
    if policy.force_redownload {
        return Action::ForceRedownload(existing.path.clone());
    }
    if !policy.skip_existing {
        return Action::Transfer;
    }
    if existing.is_complete(expected_size) {
        return Action::Skip(existing.path.clone());
    }
    Action::RemoveStaleAndTransfer(existing.path.clone())
}

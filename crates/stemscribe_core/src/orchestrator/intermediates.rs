//! Files a job owns and must remove when it ends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Ordered set of paths owned by one job.
///
/// Paths are removed by `cleanup`, which drains the set, so each path is
/// deleted at most once. If the set is dropped with paths still tracked,
/// they are removed then.
#[derive(Debug, Default)]
pub struct Intermediates {
    paths: Vec<PathBuf>,
}

impl Intermediates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start owning `path`. It may not exist yet.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Stop owning `path` (it becomes a result). Returns whether it was tracked.
    pub fn release(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every tracked path, in tracking order.
    ///
    /// One failed removal does not stop the others.
    pub fn cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for path in std::mem::take(&mut self.paths) {
            match remove_path(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => report.missing.push(path),
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        report
    }
}

impl Drop for Intermediates {
    fn drop(&mut self) {
        if !self.paths.is_empty() {
            let report = self.cleanup();
            tracing::debug!(
                "Dropped intermediates: removed {}, missing {}, failed {}",
                report.removed.len(),
                report.missing.len(),
                report.failed.len()
            );
        }
    }
}

/// Outcome of one cleanup pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Already gone before cleanup.
    pub missing: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

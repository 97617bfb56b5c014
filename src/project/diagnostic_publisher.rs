//! Where finished analyses go.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::analysis::Issue;

/// Receives each document's issues.
///
/// `publish` replaces everything previously published for the path; it is
/// never an incremental merge.
pub trait DiagnosticPublisher: Send + Sync {
    fn publish(&self, path: &Path, issues: Vec<Issue>);

    fn clear(&self, path: &Path);
}

impl<P: DiagnosticPublisher + ?Sized> DiagnosticPublisher for Arc<P> {
    fn publish(&self, path: &Path, issues: Vec<Issue>) {
        (**self).publish(path, issues)
    }

    fn clear(&self, path: &Path) {
        (**self).clear(path)
    }
}

#[derive(Debug, Default)]
struct Published {
    issues: FxHashMap<PathBuf, Vec<Issue>>,
    publish_counts: FxHashMap<PathBuf, usize>,
}

/// Keeps the latest issue set per path in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    inner: Arc<RwLock<Published>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest issues published for `path`, if any.
    pub fn published(&self, path: &Path) -> Option<Vec<Issue>> {
        self.inner.read().issues.get(path).cloned()
    }

    /// How many times `path` has been published (clears not counted).
    pub fn publish_count(&self, path: &Path) -> usize {
        self.inner
            .read()
            .publish_counts
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Paths that currently have published issues.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.inner.read().issues.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl DiagnosticPublisher for MemoryPublisher {
    fn publish(&self, path: &Path, issues: Vec<Issue>) {
        let mut inner = self.inner.write();
        inner.issues.insert(path.to_path_buf(), issues);
        *inner.publish_counts.entry(path.to_path_buf()).or_default() += 1;
    }

    fn clear(&self, path: &Path) {
        self.inner.write().issues.remove(path);
    }
}

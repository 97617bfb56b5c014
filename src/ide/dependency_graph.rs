//! Include edges between documents.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};

type PathSet = IndexSet<PathBuf, FxBuildHasher>;

/// Forward (`includes`) and reverse (`included_by`) include edges.
///
/// Both directions are updated together, so they always mirror each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    includes: FxHashMap<PathBuf, PathSet>,
    included_by: FxHashMap<PathBuf, PathSet>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every outgoing edge of `file`.
    ///
    /// Old edges (and their reverse entries) are removed before the new
    /// ones are added.
    pub fn set_includes(&mut self, file: &Path, includes: impl IntoIterator<Item = PathBuf>) {
        self.remove_outgoing(file);

        let targets: PathSet = includes.into_iter().filter(|t| t != file).collect();
        for target in &targets {
            self.included_by
                .entry(target.clone())
                .or_default()
                .insert(file.to_path_buf());
        }
        if !targets.is_empty() {
            self.includes.insert(file.to_path_buf(), targets);
        }
    }

    /// Forget `file`'s outgoing edges. Edges from other files into it stay.
    pub fn remove_file(&mut self, file: &Path) {
        self.remove_outgoing(file);
    }

    fn remove_outgoing(&mut self, file: &Path) {
        let Some(old) = self.includes.remove(file) else {
            return;
        };
        for target in old {
            if let Some(sources) = self.included_by.get_mut(&target) {
                sources.shift_remove(file);
                if sources.is_empty() {
                    self.included_by.remove(&target);
                }
            }
        }
    }

    /// Files `file` includes, in include order.
    pub fn includes_of(&self, file: &Path) -> Vec<PathBuf> {
        self.includes
            .get(file)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Files that include `file`, in the order they were recorded.
    pub fn dependents_of(&self, file: &Path) -> Vec<PathBuf> {
        self.included_by
            .get(file)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn file_count(&self) -> usize {
        self.includes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.included_by.is_empty()
    }

    /// Check both directions agree.
    pub fn is_consistent(&self) -> bool {
        let forward = self.includes.iter().all(|(file, targets)| {
            targets.iter().all(|target| {
                self.included_by
                    .get(target)
                    .is_some_and(|sources| sources.contains(file))
            })
        });
        let backward = self.included_by.iter().all(|(target, sources)| {
            sources.iter().all(|file| {
                self.includes
                    .get(file)
                    .is_some_and(|targets| targets.contains(target))
            })
        });
        forward && backward
    }
}

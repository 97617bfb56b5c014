//! File access for include resolution.
//!
//! The collector never touches the filesystem directly; it goes through a
//! [`FileProvider`], so hosts can serve unsaved editor buffers and tests can
//! serve fixtures.

use std::hash::{BuildHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};

use super::error::IncludeError;

/// Identity check for cached include results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified: Option<SystemTime>,
    pub size: u64,
    /// Content hash, for sources without a modification time
    pub fingerprint: Option<u64>,
}

impl FileStat {
    /// Stat for an in-memory buffer.
    pub fn of_text(text: &str) -> Self {
        let mut hasher = FxBuildHasher.build_hasher();
        text.hash(&mut hasher);
        Self {
            modified: None,
            size: text.len() as u64,
            fingerprint: Some(hasher.finish()),
        }
    }
}

/// Source of include file contents.
pub trait FileProvider: Send + Sync {
    /// Map an include path to a file.
    ///
    /// Absolute paths pass through; relative paths are joined onto the
    /// including document's directory. No search path is consulted.
    fn resolve_include_path(&self, path: &str, base_dir: &Path) -> Option<PathBuf> {
        if path.trim().is_empty() {
            return None;
        }
        let path = Path::new(path);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            Some(base_dir.join(path))
        }
    }

    fn read_file(&self, path: &Path) -> Result<String, IncludeError>;

    fn stat_file(&self, path: &Path) -> Result<FileStat, IncludeError>;
}

/// Reads straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileProvider;

impl FileProvider for DiskFileProvider {
    fn read_file(&self, path: &Path) -> Result<String, IncludeError> {
        std::fs::read_to_string(path).map_err(|e| IncludeError::read(path, e))
    }

    fn stat_file(&self, path: &Path) -> Result<FileStat, IncludeError> {
        let metadata = std::fs::metadata(path).map_err(|e| IncludeError::stat(path, e))?;
        Ok(FileStat {
            modified: metadata.modified().ok(),
            size: metadata.len(),
            fingerprint: None,
        })
    }
}

/// Open documents shared between the manager and an overlay provider.
pub type OpenDocuments = Arc<RwLock<FxHashMap<PathBuf, String>>>;

/// Serves open documents from memory and everything else from `inner`.
///
/// Open documents stat as [`FileStat::of_text`]: no modification time, but
/// a content hash, so any edit (even one that keeps the length) changes the
/// stat and a cached entry taken from disk never matches a buffer.
#[derive(Debug, Clone)]
pub struct OverlayFileProvider<F> {
    inner: F,
    open: OpenDocuments,
}

impl<F: FileProvider> OverlayFileProvider<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            open: OpenDocuments::default(),
        }
    }

    /// Share an existing open-document table.
    pub fn with_documents(inner: F, open: OpenDocuments) -> Self {
        Self { inner, open }
    }

    pub fn documents(&self) -> &OpenDocuments {
        &self.open
    }

    pub fn set_document(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.open.write().insert(path.into(), text.into());
    }

    pub fn remove_document(&self, path: &Path) {
        self.open.write().remove(path);
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.open.read().contains_key(path)
    }
}

impl<F: FileProvider> FileProvider for OverlayFileProvider<F> {
    fn resolve_include_path(&self, path: &str, base_dir: &Path) -> Option<PathBuf> {
        self.inner.resolve_include_path(path, base_dir)
    }

    fn read_file(&self, path: &Path) -> Result<String, IncludeError> {
        if let Some(text) = self.open.read().get(path) {
            return Ok(text.clone());
        }
        self.inner.read_file(path)
    }

    fn stat_file(&self, path: &Path) -> Result<FileStat, IncludeError> {
        if let Some(text) = self.open.read().get(path) {
            return Ok(FileStat::of_text(text));
        }
        self.inner.stat_file(path)
    }
}

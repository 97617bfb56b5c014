//! Types contributed by a document's `include` statements.
//!
//! Each included file is scanned with the same declaration scan the
//! analyzer uses, without running the full analysis. Results are cached per
//! resolved path and only reused while the file's stat still matches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::error::IncludeError;
use super::file_provider::{FileProvider, FileStat};
use crate::cache::{AdaptiveCache, CacheConfig, CacheStats, Clock};
use crate::syntax::{TypeKindMap, declared_types, scan_declarations, scan_includes, strip_comments};

#[derive(Debug, Clone)]
struct IncludeCacheEntry {
    types: Arc<TypeKindMap>,
    stat: FileStat,
}

/// Result of collecting one document's includes.
#[derive(Debug, Clone, Default)]
pub struct CollectedIncludes {
    /// Merged declarations of every readable include
    pub types: TypeKindMap,
    /// Every include that resolved to a path, readable or not
    pub includes: Vec<PathBuf>,
}

/// Collects declared types from included files.
pub struct IncludeTypeCollector<F> {
    provider: F,
    cache: Mutex<AdaptiveCache<PathBuf, IncludeCacheEntry>>,
}

impl<F: FileProvider> IncludeTypeCollector<F> {
    pub fn new(provider: F) -> Self {
        Self::with_cache(provider, AdaptiveCache::new(CacheConfig::default()))
    }

    pub fn with_config(provider: F, config: CacheConfig) -> Self {
        Self::with_cache(provider, AdaptiveCache::new(config))
    }

    /// Use an explicit clock for cache expiry.
    pub fn with_clock(provider: F, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_cache(provider, AdaptiveCache::with_clock(config, clock))
    }

    fn with_cache(provider: F, cache: AdaptiveCache<PathBuf, IncludeCacheEntry>) -> Self {
        let cache = cache.with_size_estimator(|entry: &IncludeCacheEntry| entry.types.len());
        Self {
            provider,
            cache: Mutex::new(cache),
        }
    }

    pub fn provider(&self) -> &F {
        &self.provider
    }

    /// Collect the types declared by `text`'s includes.
    ///
    /// Include paths resolve relative to `document`'s directory. A failing
    /// include is logged and skipped; the others are still collected.
    pub fn collect(&self, document: &Path, text: &str) -> CollectedIncludes {
        let source = strip_comments(text);
        let base_dir = document.parent().unwrap_or_else(|| Path::new(""));
        let mut collected = CollectedIncludes::default();

        for include in scan_includes(source.code_lines()) {
            let Some(path) = self.provider.resolve_include_path(&include.path, base_dir) else {
                let err = IncludeError::Unresolvable {
                    path: include.path.clone(),
                    base_dir: base_dir.to_path_buf(),
                };
                warn!("[INCLUDES] {}: {err}", document.display());
                continue;
            };

            match self.types_for(&path) {
                Ok(types) => {
                    collected
                        .types
                        .extend(types.iter().map(|(name, kind)| (name.clone(), *kind)));
                }
                Err(err) => warn!("[INCLUDES] {}: {err}", document.display()),
            }
            collected.includes.push(path);
        }

        trace!(
            "[INCLUDES] {}: {} includes, {} types",
            document.display(),
            collected.includes.len(),
            collected.types.len()
        );
        collected
    }

    fn types_for(&self, path: &Path) -> Result<Arc<TypeKindMap>, IncludeError> {
        let stat = self.provider.stat_file(path)?;

        let cached = self
            .cache
            .lock()
            .get(path)
            .filter(|entry| entry.stat == stat)
            .map(|entry| entry.types.clone());
        if let Some(types) = cached {
            return Ok(types);
        }

        let text = self.provider.read_file(path)?;
        let source = strip_comments(&text);
        let types = Arc::new(declared_types(&scan_declarations(source.code_lines())));
        self.cache.lock().set(
            path.to_path_buf(),
            IncludeCacheEntry {
                types: types.clone(),
                stat,
            },
        );
        Ok(types)
    }

    /// Drop the cached entry for one file.
    pub fn invalidate(&self, path: &Path) {
        self.cache.lock().delete(path);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn cached_files(&self) -> usize {
        self.cache.lock().size()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

//! Tuning knobs for the diagnostics pipeline.

use std::path::Path;
use std::time::Duration;

use crate::base::constants::THRIFT_EXTENSIONS;
use crate::cache::CacheConfig;

/// Options for [`DiagnosticManager`](super::DiagnosticManager).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisOptions {
    /// Quiet period after an edit before analysis starts
    pub debounce_delay: Duration,
    /// Minimum time between two runs of the same unchanged document
    pub min_analysis_interval: Duration,
    /// Runs allowed at once across all documents
    pub max_concurrent_analyses: usize,
    /// Delay before re-analyzing documents that include a changed one
    pub dependent_delay: Duration,
    /// How long a scanned include stays cached
    pub include_cache_ttl: Duration,
    /// Maximum number of cached includes
    pub include_cache_size: usize,
    /// Extensions that count as IDL sources for external change events
    pub file_extensions: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(300),
            min_analysis_interval: Duration::from_secs(1),
            max_concurrent_analyses: 1,
            dependent_delay: Duration::from_secs(1),
            include_cache_ttl: Duration::from_secs(180),
            include_cache_size: 100,
            file_extensions: THRIFT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl AnalysisOptions {
    /// Scheduler settings derived from these options.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce_delay: self.debounce_delay,
            min_analysis_interval: self.min_analysis_interval,
            max_concurrent_analyses: self.max_concurrent_analyses,
        }
    }

    /// Include-cache settings derived from these options.
    pub fn include_cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.include_cache_size,
            ttl: Some(self.include_cache_ttl),
            ..CacheConfig::default()
        }
    }

    /// Check if `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.file_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

/// Settings for [`AnalysisScheduler`](super::AnalysisScheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    pub debounce_delay: Duration,
    pub min_analysis_interval: Duration,
    pub max_concurrent_analyses: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        AnalysisOptions::default().scheduler_config()
    }
}

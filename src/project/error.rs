//! Error types for include resolution and analysis runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading one included file.
///
/// These never abort a collection; the collector logs them and moves on
/// to the next include.
#[derive(Debug, Error)]
pub enum IncludeError {
    /// The include path could not be mapped to a file.
    #[error("Cannot resolve include '{path}' from {}", base_dir.display())]
    Unresolvable { path: String, base_dir: PathBuf },

    /// The file exists in the include list but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File metadata could not be read.
    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IncludeError {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a stat error.
    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }
}

/// Errors that end an analysis run without a result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The analysis code panicked.
    #[error("Analysis of {} panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },

    /// The blocking task was cancelled or could not be joined.
    #[error("Analysis task for {} failed: {source}", path.display())]
    Join {
        path: PathBuf,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl AnalysisError {
    /// Classify a failed blocking task.
    pub fn from_join(path: impl Into<PathBuf>, err: tokio::task::JoinError) -> Self {
        let path = path.into();
        if err.is_panic() {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Self::Panicked { path, message }
        } else {
            Self::Join { path, source: err }
        }
    }
}

//! Temporary directories and polling for manager tests.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use thrift_analyzer::AnalysisOptions;
use tokio::time::{Instant, sleep};

/// A scratch directory of `.thrift` files.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file to disk and return its path.
    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, text).expect("write fixture");
        path
    }
}

/// Short delays so tests finish quickly.
pub fn fast_options() -> AnalysisOptions {
    AnalysisOptions {
        debounce_delay: Duration::from_millis(20),
        min_analysis_interval: Duration::from_millis(50),
        dependent_delay: Duration::from_millis(30),
        ..AnalysisOptions::default()
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

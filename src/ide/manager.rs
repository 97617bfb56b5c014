//! DiagnosticManager: keeps published issues in step with open documents.
//!
//! ## Lifecycle
//!
//! | Event                 | Effect                                             |
//! |-----------------------|----------------------------------------------------|
//! | `open`                | analyze immediately                                |
//! | `change`              | analyze after the debounce delay                   |
//! | `save`                | analyze immediately                                |
//! | `close`               | drop issues, timers, graph edges and cache entry   |
//! | `external_file_changed` | clear the include cache, re-analyze every open document |
//!
//! After each run, documents that include the analyzed one are re-analyzed
//! once (one hop) after `dependent_delay`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::time::Instant;
use tracing::{debug, error, trace};

use super::dependency_graph::DependencyGraph;
use super::options::AnalysisOptions;
use super::scheduler::{AnalysisScheduler, ScheduleRequest};
use crate::analysis::{Issue, analyze};
use crate::project::{
    AnalysisError, DiagnosticPublisher, FileProvider, IncludeTypeCollector, OverlayFileProvider,
};

/// Per-document analysis bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentAnalysisState {
    /// Bumped on every open or change
    pub version: u64,
    pub is_analyzing: bool,
    pub last_analysis_at: Option<Instant>,
}

/// Why an analysis was requested. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    Open,
    Change,
    Save,
    Dependency,
    External,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Change => "change",
            Self::Save => "save",
            Self::Dependency => "dependency",
            Self::External => "external",
        }
    }
}

struct ManagerInner<F, P> {
    options: AnalysisOptions,
    scheduler: AnalysisScheduler<PathBuf>,
    collector: IncludeTypeCollector<OverlayFileProvider<F>>,
    publisher: P,
    documents: Mutex<FxHashMap<PathBuf, DocumentAnalysisState>>,
    graph: Mutex<DependencyGraph>,
}

/// Drives analysis of open documents and publishes the results.
///
/// Must be used from within a Tokio runtime.
pub struct DiagnosticManager<F, P> {
    inner: Arc<ManagerInner<F, P>>,
}

impl<F, P> Clone for DiagnosticManager<F, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, P> DiagnosticManager<F, P>
where
    F: FileProvider + 'static,
    P: DiagnosticPublisher + 'static,
{
    pub fn new(provider: F, publisher: P, options: AnalysisOptions) -> Self {
        let collector = IncludeTypeCollector::with_config(
            OverlayFileProvider::new(provider),
            options.include_cache_config(),
        );
        Self {
            inner: Arc::new(ManagerInner {
                scheduler: AnalysisScheduler::new(options.scheduler_config()),
                collector,
                publisher,
                documents: Mutex::new(FxHashMap::default()),
                graph: Mutex::new(DependencyGraph::new()),
                options,
            }),
        }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.inner.options
    }

    pub fn publisher(&self) -> &P {
        &self.inner.publisher
    }

    /// A document was opened in the editor.
    pub fn open(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        let path = path.into();
        self.inner.set_text(&path, text.into());
        self.inner
            .schedule(&path, true, false, AnalysisSource::Open);
    }

    /// An open document's text changed.
    pub fn change(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        let path = path.into();
        self.inner.set_text(&path, text.into());
        self.inner
            .schedule(&path, false, false, AnalysisSource::Change);
    }

    /// An open document was saved.
    pub fn save(&self, path: &Path) {
        self.inner.schedule(path, true, false, AnalysisSource::Save);
    }

    /// An open document was closed.
    pub fn close(&self, path: &Path) {
        let inner = &self.inner;
        inner.scheduler.cancel(&path.to_path_buf());
        inner.documents.lock().remove(path);
        inner.collector.provider().remove_document(path);
        inner.collector.invalidate(path);
        inner.graph.lock().remove_file(path);
        inner.publisher.clear(path);
        debug!("[DIAGNOSTICS] closed {}", path.display());
    }

    /// A file changed outside the editor.
    ///
    /// Any matching file may be included somewhere, so the whole include
    /// cache is dropped and every open document is re-analyzed.
    pub fn external_file_changed(&self, path: &Path) {
        if !self.inner.options.matches_extension(path) {
            return;
        }
        self.inner.collector.clear();

        let open: Vec<PathBuf> = self.inner.documents.lock().keys().cloned().collect();
        debug!(
            "[DIAGNOSTICS] {} changed externally, re-analyzing {} documents",
            path.display(),
            open.len()
        );
        for doc in open {
            self.inner
                .schedule(&doc, true, false, AnalysisSource::External);
        }
    }

    /// Request an analysis of an open document.
    ///
    /// Returns `false` when the document is not open or the scheduler
    /// dropped the request.
    pub fn schedule_analysis(
        &self,
        path: &Path,
        immediate: bool,
        skip_dependents: bool,
        source: AnalysisSource,
    ) -> bool {
        self.inner.schedule(path, immediate, skip_dependents, source)
    }

    /// Cancel pending work for a document and withdraw its issues.
    pub fn clear_document(&self, path: &Path) {
        self.inner.scheduler.cancel(&path.to_path_buf());
        self.inner.publisher.clear(path);
    }

    /// Stop all scheduling and drop every piece of state.
    pub fn dispose(&self) {
        let inner = &self.inner;
        inner.scheduler.dispose();
        let open: Vec<PathBuf> = inner.documents.lock().drain().map(|(path, _)| path).collect();
        for path in &open {
            inner.collector.provider().remove_document(path);
            inner.publisher.clear(path);
        }
        inner.collector.clear();
        *inner.graph.lock() = DependencyGraph::new();
        debug!("[DIAGNOSTICS] disposed");
    }

    /// A copy of the current include graph.
    pub fn dependency_snapshot(&self) -> DependencyGraph {
        self.inner.graph.lock().clone()
    }

    pub fn document_state(&self, path: &Path) -> Option<DocumentAnalysisState> {
        self.inner.documents.lock().get(path).copied()
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.inner.documents.lock().contains_key(path)
    }

    /// Number of include files currently cached.
    pub fn cached_includes(&self) -> usize {
        self.inner.collector.cached_files()
    }
}

impl<F, P> ManagerInner<F, P>
where
    F: FileProvider + 'static,
    P: DiagnosticPublisher + 'static,
{
    fn set_text(&self, path: &Path, text: String) {
        {
            let mut documents = self.documents.lock();
            let state = documents
                .entry(path.to_path_buf())
                .or_insert(DocumentAnalysisState {
                    version: 0,
                    is_analyzing: false,
                    last_analysis_at: None,
                });
            state.version += 1;
        }
        self.collector.provider().set_document(path, text);
        // Documents that include this one must see the unsaved text
        self.collector.invalidate(path);
    }

    fn schedule(
        self: &Arc<Self>,
        path: &Path,
        immediate: bool,
        skip_dependents: bool,
        source: AnalysisSource,
    ) -> bool {
        let request = ScheduleRequest {
            immediate,
            ..ScheduleRequest::default()
        };
        self.schedule_request(path, request, skip_dependents, source)
    }

    fn schedule_request(
        self: &Arc<Self>,
        path: &Path,
        mut request: ScheduleRequest,
        skip_dependents: bool,
        source: AnalysisSource,
    ) -> bool {
        let Some(version) = self.documents.lock().get(path).map(|d| d.version) else {
            debug!(
                "[DIAGNOSTICS] {} not open, {} request ignored",
                path.display(),
                source.as_str()
            );
            return false;
        };
        request.version = version;

        let inner = Arc::clone(self);
        let doc = path.to_path_buf();
        let accepted = self
            .scheduler
            .schedule(doc.clone(), request, move || async move {
                inner.run_analysis(doc, skip_dependents).await;
            });
        trace!(
            "[DIAGNOSTICS] {} v{version} ({}): accepted={accepted}",
            path.display(),
            source.as_str()
        );
        accepted
    }

    async fn run_analysis(self: Arc<Self>, path: PathBuf, skip_dependents: bool) {
        let Some(text) = self.collector.provider().documents().read().get(&path).cloned() else {
            return;
        };
        self.set_analyzing(&path, true);

        let worker = Arc::clone(&self);
        let doc = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let collected = worker.collector.collect(&doc, &text);
            let issues = analyze(&text, &collected.types);
            (collected.includes, issues)
        })
        .await;

        match result {
            Ok((includes, issues)) => self.complete(&path, includes, issues, skip_dependents),
            Err(err) => {
                let err = AnalysisError::from_join(&path, err);
                error!("[DIAGNOSTICS] {err}");
                self.publisher.clear(&path);
            }
        }
        self.set_analyzing(&path, false);
    }

    fn complete(
        self: &Arc<Self>,
        path: &Path,
        includes: Vec<PathBuf>,
        issues: Vec<Issue>,
        skip_dependents: bool,
    ) {
        // Closed while running: nothing to publish into
        if !self.documents.lock().contains_key(path) {
            return;
        }

        trace!("[DIAGNOSTICS] {}: {} issues", path.display(), issues.len());
        self.publisher.publish(path, issues);
        self.graph.lock().set_includes(path, includes);

        if skip_dependents {
            return;
        }

        let dependents = self.graph.lock().dependents_of(path);
        for dependent in dependents {
            let request = ScheduleRequest {
                immediate: true,
                min_delay: self.options.dependent_delay,
                ..ScheduleRequest::default()
            };
            self.schedule_request(&dependent, request, true, AnalysisSource::Dependency);
        }
    }

    fn set_analyzing(&self, path: &Path, analyzing: bool) {
        if let Some(state) = self.documents.lock().get_mut(path) {
            state.is_analyzing = analyzing;
            if !analyzing {
                state.last_analysis_at = Some(Instant::now());
            }
        }
    }
}

//! Editor-facing diagnostics pipeline.
//!
//! This module connects the pure analyzer to a live editor session:
//!
//! 1. [`DiagnosticManager`] reacts to document lifecycle events.
//! 2. [`AnalysisScheduler`] debounces, throttles and serializes the
//!    resulting runs.
//! 3. Each run collects include types, analyzes the text and publishes the
//!    full issue set through a [`DiagnosticPublisher`](crate::project::DiagnosticPublisher).
//! 4. [`DependencyGraph`] tracks who includes whom, so dependents are
//!    re-analyzed when a document changes.
//!
//! ## Usage
//!
//! ```ignore
//! use thrift_analyzer::ide::{AnalysisOptions, DiagnosticManager};
//! use thrift_analyzer::project::{DiskFileProvider, MemoryPublisher};
//!
//! let publisher = MemoryPublisher::new();
//! let manager = DiagnosticManager::new(DiskFileProvider, publisher.clone(), AnalysisOptions::default());
//! manager.open("/work/api.thrift", "struct S { 1: string a, 1: string b }");
//! ```

mod dependency_graph;
mod manager;
mod options;
mod scheduler;

pub use dependency_graph::DependencyGraph;
pub use manager::{AnalysisSource, DiagnosticManager, DocumentAnalysisState};
pub use options::{AnalysisOptions, SchedulerConfig};
pub use scheduler::{AnalysisPhase, AnalysisScheduler, ScheduleRequest};

//! # thrift-analyzer-base
//!
//! Semantic diagnostics for Thrift IDL files: bracket balance, field ids,
//! type resolution, default values and service contracts, re-analyzed as
//! documents change.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → DiagnosticManager, AnalysisScheduler, DependencyGraph
//!   ↓
//! project   → FileProvider, IncludeTypeCollector, DiagnosticPublisher
//!   ↓
//! analysis  → analyze(), Issue / IssueCode, member checks
//!   ↓
//! syntax    → Logos comment stripper, declaration scan, type expressions
//!   ↓
//! cache     → AdaptiveCache (TTL + LRU-K + priority)
//!   ↓
//! base      → Position/Span, UTF-16 columns, language constants
//! ```

// ============================================================================
// MODULES (dependency order: base → cache → syntax → analysis → project → ide)
// ============================================================================

/// Foundation types: positions, UTF-16 columns, language constants
pub mod base;

/// Bounded caches with TTL, LRU-K and priority eviction
pub mod cache;

/// Syntax: comment stripping, declaration scan, type expressions
pub mod syntax;

/// Text analysis: the pure `analyze` entry point and issue types
pub mod analysis;

/// Project collaborators: file providers, include collection, publishing
pub mod project;

/// Editor pipeline: scheduling, dependency tracking, diagnostics manager
pub mod ide;

// Re-export the main entry points
pub use analysis::{Issue, IssueCode, Severity, analyze};
pub use base::{Position, Span};
pub use ide::{AnalysisOptions, DiagnosticManager};
pub use syntax::{TypeKind, TypeKindMap};

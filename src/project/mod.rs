//! Project-level collaborators: file access, include collection and
//! diagnostic publishing.

mod diagnostic_publisher;
mod error;
pub mod file_provider;
mod includes;

pub use diagnostic_publisher::{DiagnosticPublisher, MemoryPublisher};
pub use error::{AnalysisError, IncludeError};
pub use file_provider::{
    DiskFileProvider, FileProvider, FileStat, OpenDocuments, OverlayFileProvider,
};
pub use includes::{CollectedIncludes, IncludeTypeCollector};

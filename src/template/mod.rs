//! Template Pattern Scanning
//!
//! The regex-based pass over template and source files: hint prefilter,
//! false-positive suppression, context analysis, line scoring and grouped
//! emission with per-file deduplication.

pub mod context;
pub mod fp;
pub mod hints;
pub mod line_score;
pub mod scanner;

pub use scanner::{TemplateScanStats, TemplateScanner};

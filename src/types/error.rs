//! Unified Error Type System
//!
//! Centralized error types for the entire engine.
//!
//! ## Error Categories
//!
//! - **Boot errors** (`Validation`, `RulesLoad`, `Config`): raised before any
//!   analysis starts and abort the run.
//! - **Unit errors** (`Parse`, `FileProcessing`, `ResourceLimit`): scoped to a
//!   single file, rule, or chain. The owning unit is skipped and the run
//!   continues; no unit failure may poison a sibling unit.
//!
//! ## Design Principles
//!
//! - Single unified error type (JavelinError) for the entire crate
//! - Structured variants with context for better diagnostics
//! - Per-unit isolation is expressed as `Option`/`Result` at the call site,
//!   never by catching and rethrowing

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, JavelinError>;

/// Unified error type for the analysis engine
#[derive(Debug, Error)]
pub enum JavelinError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Boot Errors (fatal)
    // -------------------------------------------------------------------------
    /// Bad project path, bad rules path, or malformed input at construction
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Rules bundle could not be read or decoded
    #[error("Failed to load rules from {path}: {message}")]
    RulesLoad { path: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Unit Errors (non-fatal, the unit is skipped)
    // -------------------------------------------------------------------------
    /// Java parser/lexer failure on one file
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    /// Read or decode failure, size/line overflow on one file
    #[error("File processing failed for {path}: {message}")]
    FileProcessing { path: String, message: String },

    /// A rule or file exceeded a hard resource cap
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),
}

impl JavelinError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a rules-load error with the offending path
    pub fn rules_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RulesLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a per-file parse error
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create a per-file processing error
    pub fn file_processing(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileProcessing {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors that abort the whole run rather than one unit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::RulesLoad { .. } | Self::Config(_)
        )
    }
}

pub mod error;
pub mod finding;
pub mod signature;

pub use error::{JavelinError, Result};
pub use finding::{Finding, ScanMode, Severity, sort_for_report};
pub use signature::Signature;

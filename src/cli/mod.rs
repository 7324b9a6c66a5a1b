pub mod report;

pub use report::{OutputFormat, print_report, render_text};

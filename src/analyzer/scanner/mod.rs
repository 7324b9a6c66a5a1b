pub mod file_scanner;

pub use file_scanner::{FileWalker, extension_of, relative_path};

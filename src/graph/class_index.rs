//! Class Index
//!
//! Per-class method metadata gathered during the build phase: whether a
//! method declares parameters and whether it carries an HTTP mapping
//! annotation. Entries are appended during `build` and never mutated
//! afterward.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::Signature;

/// Metadata for one declared method
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodInfo {
    /// The declared parameter list is non-empty
    pub requires_params: bool,
    /// Any annotation from the HTTP mapping set is present
    pub has_mapping_annotation: bool,
}

/// One parsed class: its defining file and declared methods
#[derive(Debug, Clone, Default)]
pub struct ClassRecord {
    pub file_path: PathBuf,
    pub methods: HashMap<String, MethodInfo>,
}

/// Maps class names to their records
#[derive(Debug, Default)]
pub struct ClassIndex {
    classes: HashMap<String, ClassRecord>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_name: String, record: ClassRecord) {
        self.classes.insert(class_name, record);
    }

    pub fn file_of(&self, class_name: &str) -> Option<&Path> {
        self.classes.get(class_name).map(|r| r.file_path.as_path())
    }

    /// True iff the class is known and the method carries a mapping
    /// annotation; unresolved externals are never entry points
    pub fn is_entry_point(&self, sig: &Signature) -> bool {
        self.classes
            .get(sig.class_name())
            .and_then(|r| r.methods.get(sig.method()))
            .map(|m| m.has_mapping_annotation)
            .unwrap_or(false)
    }

    /// Whether the method takes parameters; unknown methods default to true
    /// so unresolved external callers stay in the search
    pub fn is_has_parameters(&self, sig: &Signature) -> bool {
        self.classes
            .get(sig.class_name())
            .and_then(|r| r.methods.get(sig.method()))
            .map(|m| m.requires_params)
            .unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

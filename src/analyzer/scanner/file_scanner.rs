//! Project File Walker
//!
//! Walks the project tree and decides, per file, whether the AST pass or the
//! template pass may see it: build-directory skip list, extension filters,
//! size caps and a path-traversal guard keeping everything under the project
//! root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::constants::{limits, scan};

/// Walks a project and applies the per-file admission rules
pub struct FileWalker {
    root: PathBuf,
    ignore_skip_dirs: bool,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ignore_skip_dirs: false,
            exclude: Vec::new(),
            max_file_size: limits::MAX_FILE_SIZE,
        }
    }

    /// Disable the build-directory skip list
    pub fn ignore_skip_dirs(mut self, ignore: bool) -> Self {
        self.ignore_skip_dirs = ignore;
        self
    }

    /// Add user-supplied glob patterns excluded from every walk
    pub fn with_exclude(mut self, patterns: &[String]) -> Self {
        for p in patterns {
            match glob::Pattern::new(p) {
                Ok(pat) => self.exclude.push(pat),
                Err(e) => warn!(pattern = %p, error = %e, "invalid exclude pattern, ignored"),
            }
        }
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All `.java` files admitted for AST construction
    pub fn java_files(&self) -> Vec<PathBuf> {
        self.collect(|path| extension_of(path) == "java")
    }

    /// Files eligible for the template pass: any extension in the rule map
    /// plus the always-included Java-related set
    pub fn template_files(&self, rule_exts: &HashSet<String>) -> Vec<PathBuf> {
        self.collect(|path| {
            let ext = extension_of(path);
            rule_exts.contains(&ext) || scan::JAVA_RELATED_EXTS.contains(&ext.as_str())
        })
    }

    fn collect(&self, wanted: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false)
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || !wanted(path) {
                continue;
            }
            if self.admits(path) {
                files.push(path.to_path_buf());
            }
        }
        files
    }

    /// The shared admission rules: root containment, skip dirs, excludes,
    /// size cap
    fn admits(&self, path: &Path) -> bool {
        if !self.is_under_root(path) {
            warn!(path = %path.display(), "path escapes the project root, skipped");
            return false;
        }

        let normalized = normalize_slashes(path);
        if !self.ignore_skip_dirs
            && scan::SKIP_DIR_PATTERNS
                .iter()
                .any(|p| normalized.contains(p))
        {
            return false;
        }

        if self
            .exclude
            .iter()
            .any(|pat| pat.matches(&normalized))
        {
            return false;
        }

        match path.metadata() {
            Ok(meta) if meta.len() > self.max_file_size => {
                debug!(
                    path = %path.display(),
                    size = meta.len(),
                    "file exceeds the size cap, skipped"
                );
                false
            }
            Ok(_) => true,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cannot stat file, skipped");
                false
            }
        }
    }

    /// Path-traversal guard: the resolved path must stay under the project
    /// root
    fn is_under_root(&self, path: &Path) -> bool {
        let Ok(abs_root) = std::path::absolute(&self.root) else {
            return false;
        };
        match std::path::absolute(path) {
            Ok(abs) => abs.starts_with(&abs_root),
            Err(_) => false,
        }
    }
}

/// File extension, lowercased without the dot; empty when absent
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Project-relative path with forward slashes, as findings report it
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    normalize_slashes(rel)
}

fn normalize_slashes(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

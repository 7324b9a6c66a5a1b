//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// File and line limits enforced by the walker and parsers
pub mod limits {
    /// Maximum file size considered for parsing or scanning (50 MiB)
    pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

    /// Maximum number of lines in a file before it is skipped
    pub const MAX_FILE_LINES: usize = 200_000;

    /// Lines longer than this are never handed to the regex engine
    pub const MAX_LINE_CHARS: usize = 10_000;

    /// Maximum uncompiled length of a template-rule regex
    pub const MAX_REGEX_LENGTH: usize = 5_000;
}

/// Parsed-AST cache tuning
pub mod cache {
    /// Seconds before a cached parse tree goes stale
    pub const AST_CACHE_TTL_SECS: u64 = 300;

    /// Maximum number of parse trees kept in the cache
    pub const AST_CACHE_MAX_ENTRIES: usize = 1_000;

    /// Expired entries removed per eviction sweep
    pub const AST_CACHE_EVICT_BATCH: usize = 100;
}

/// Call-graph backtracking parameters
pub mod graph {
    /// Default backtracking depth when the rule bundle carries none
    pub const DEFAULT_DEPTH: usize = 15;

    /// Depth floor applied to configured depths below the cutoff
    pub const DEPTH_FLOOR: usize = 15;

    /// Configured depths at or above this value are honored as-is
    pub const DEPTH_FLOOR_CUTOFF: usize = 10;
}

/// Template-scanner caps and windows
pub mod scan {
    /// Regex evaluations allowed per file in full mode
    pub const MAX_REGEX_EVALS_FULL: usize = 2_000;

    /// Regex evaluations allowed per file in lite mode
    pub const MAX_REGEX_EVALS_LITE: usize = 500;

    /// Findings allowed per (rule, file) pair in full mode
    pub const PER_FILE_RULE_CAP_FULL: usize = 5;

    /// Findings allowed per (rule, file) pair in lite mode
    pub const PER_FILE_RULE_CAP_LITE: usize = 1;

    /// Context-analysis window in full mode (lines each side)
    pub const CONTEXT_WINDOW_FULL: usize = 15;

    /// Context-analysis window in lite mode
    pub const CONTEXT_WINDOW_LITE: usize = 7;

    /// Findings emitted between progress-callback flushes
    pub const PARTIAL_FLUSH_INTERVAL: usize = 50;

    /// Lines scanned ahead of a `<form method="post">` for a CSRF token
    pub const CSRF_FORM_WINDOW: usize = 50;

    /// Directory substrings skipped during walks (build/dependency output)
    pub const SKIP_DIR_PATTERNS: &[&str] =
        &["/target/", "/build/", "/dist/", "/out/", "/node_modules/"];

    /// Extensions always eligible for the template pass, rule map aside
    pub const JAVA_RELATED_EXTS: &[&str] = &["java", "jsp", "jspx", "class"];
}

/// Orchestration and worker-pool tuning
pub mod engine {
    /// Parsed files between progress heartbeats
    pub const HEARTBEAT_EVERY_FILES: usize = 10;

    /// File count above which the parse pool is engaged
    pub const PARALLEL_PARSE_THRESHOLD: usize = 10;

    /// Upper bound on parse worker threads
    pub const MAX_WORKERS: usize = 4;

    /// Sleep granularity while paused (milliseconds)
    pub const PAUSE_POLL_MS: u64 = 100;
}

/// HTTP handler annotations that mark a method as an entry point
pub const HTTP_MAPPING_ANNOTATIONS: &[&str] = &[
    "GetMapping",
    "PostMapping",
    "RequestMapping",
    "PutMapping",
    "DeleteMapping",
    "Path",
    "GET",
    "POST",
    "PUT",
    "DELETE",
];

/// Sentinel used when a callee's base type cannot be resolved
pub const UNRESOLVED_BASE_TYPE: &str = "[!]unresolved";

/// Caller signature used when an invocation sits outside any method
pub const UNKNOWN_CALLER: &str = "unknown:unknown";

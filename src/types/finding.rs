//! Finding Records
//!
//! One reportable vulnerability, produced either by the call-graph
//! backtracking pass or by the template scanner. The serialized shape is part
//! of the external contract: collaborators consume the JSON as-is.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Severity level of a rule or finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    /// Stable report ordering: Critical first
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Demote a severity based on how weak the confidence turned out
    ///
    /// High findings under 0.5 become Medium; anything under 0.3 becomes Low.
    pub fn demoted_for(self, confidence: f64) -> Self {
        if confidence < 0.3 {
            Self::Low
        } else if confidence < 0.5 && self == Self::High {
            Self::Medium
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scanner mode: full enables enrichment and wide context, lite tightens caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Full,
    Lite,
}

impl ScanMode {
    pub fn is_lite(self) -> bool {
        matches!(self, Self::Lite)
    }
}

/// One reportable vulnerability record
///
/// Enrichment fields (`confidence`, `sanitized_by`, `sources`, `patterns`) are
/// absent on lite-mode call-graph findings; file fields are present on
/// template findings only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub vul_type: String,
    pub sink_desc: String,
    pub severity: Severity,
    /// Sink signature for graph findings, rule name for template findings
    pub sink: String,
    /// Entry-point → sink chains; template findings carry one pseudo-chain
    /// `["relpath:line"]` or `["relpath:start-end"]`
    pub call_chains: Vec<Vec<String>>,
    pub chain_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    /// Project-relative, forward-slash normalized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Absolute path, retained for collaborators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path_abs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_lines: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_mode: Option<ScanMode>,
}

impl Finding {
    /// Compare for report ordering: severity rank, then confidence descending
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.severity
            .rank()
            .cmp(&other.severity.rank())
            .then_with(|| {
                other
                    .confidence
                    .unwrap_or(0.0)
                    .partial_cmp(&self.confidence.unwrap_or(0.0))
                    .unwrap_or(Ordering::Equal)
            })
    }
}

/// Sort findings in place for presentation
pub fn sort_for_report(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.report_order(b));
}

//! Rule Bundle Model
//!
//! Typed shapes for the JSON rule bundle. The wire format is permissive
//! (every field optional, heterogeneous overlays); validation happens once at
//! load time in the store and downstream code operates on these records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ScanMode, Severity};

/// Sink rule: methods whose invocation with tainted input is a vulnerability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkRule {
    /// Vulnerability type this sink detects (SQLI, XSS, RCE, ...)
    #[serde(default)]
    pub sink_name: String,
    #[serde(default)]
    pub sink_desc: String,
    #[serde(default)]
    pub severity_level: Severity,
    /// `Class:method` entries; the method half may carry `m1|m2` alternation
    #[serde(default)]
    pub sinks: Vec<String>,
}

/// Source rule: methods returning attacker-controlled input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRule {
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Sanitizer rule: methods that neutralize tainted input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanitizerRule {
    #[serde(default)]
    pub sanitizer_name: String,
    #[serde(default)]
    pub sanitizers: Vec<String>,
}

/// Template rule: severity-annotated regex patterns over text files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vul_type: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    /// Extensions this rule applies to, lowercased without the dot
    #[serde(default)]
    pub file_exts: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    /// All must appear on the hit line (when the option is enabled)
    #[serde(default)]
    pub must_substrings: Vec<String>,
    /// None may appear on the hit line (when the option is enabled)
    #[serde(default)]
    pub exclude_substrings: Vec<String>,
    /// Skip the hint prefilter and always run the regexes
    #[serde(default)]
    pub force_regex: bool,
    /// Origin hint some bundles attach; consulted by the test-code filter
    #[serde(default)]
    pub file_path: Option<String>,
}

impl TemplateRule {
    /// Vulnerability type, falling back to the rule name
    pub fn vul_type(&self) -> &str {
        self.vul_type.as_deref().unwrap_or(&self.name)
    }

    /// Human description, with the generic fallback the report expects
    pub fn desc(&self) -> &str {
        self.desc.as_deref().unwrap_or("template text risk")
    }
}

/// The full rule bundle as decoded from one JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBundle {
    #[serde(default)]
    pub sink_rules: Vec<SinkRule>,
    #[serde(default)]
    pub source_rules: Vec<SourceRule>,
    #[serde(default)]
    pub sanitizer_rules: Vec<SanitizerRule>,
    /// Named signature lists consumed as chain-pattern evidence
    #[serde(default)]
    pub pattern_rules: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub template_rules: Vec<TemplateRule>,
    #[serde(default)]
    pub depth: Option<usize>,
    #[serde(default)]
    pub max_seconds: Option<u64>,
}

/// Engine flags carried alongside the rules
///
/// The original bundle encoded these as dynamic `__flag__` keys; they are a
/// typed record here and set by the caller, not the JSON document.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip chain enrichment and tighten template caps
    pub lite_fast: bool,
    pub disable_template_scan: bool,
    /// Honor per-rule must/exclude substring gates
    pub apply_must_substrings: bool,
    /// Disable the build-directory skip list
    pub ignore_skip_dirs: bool,
    /// Restrict template-rule extensions to this set when non-empty
    pub include_exts: Vec<String>,
    /// Extra glob patterns excluded from every walk
    pub exclude_globs: Vec<String>,
    /// Backtracking depth cap; the finder applies its floor rule
    pub depth: Option<usize>,
    /// Wall-clock hint; parsed but ignored by the search loop
    pub max_seconds: Option<u64>,
}

impl ScanOptions {
    pub fn mode(&self) -> ScanMode {
        if self.lite_fast {
            ScanMode::Lite
        } else {
            ScanMode::Full
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_accepts_minimal_document() {
        let bundle: RuleBundle = serde_json::from_str("{}").unwrap();
        assert!(bundle.sink_rules.is_empty());
        assert!(bundle.depth.is_none());
    }

    #[test]
    fn test_sink_rule_decodes() {
        let json = r#"{
            "sink_name": "SQLI",
            "sink_desc": "JDBC statement execution",
            "severity_level": "High",
            "sinks": ["java.sql.Statement:executeQuery|executeUpdate"]
        }"#;
        let rule: SinkRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.sink_name, "SQLI");
        assert_eq!(rule.severity_level, Severity::High);
        assert_eq!(rule.sinks.len(), 1);
    }

    #[test]
    fn test_template_rule_fallbacks() {
        let rule: TemplateRule =
            serde_json::from_str(r#"{"name": "FORM_NO_CSRF"}"#).unwrap();
        assert_eq!(rule.vul_type(), "FORM_NO_CSRF");
        assert_eq!(rule.desc(), "template text risk");
        assert_eq!(rule.severity, Severity::Medium);
        assert!(!rule.force_regex);
    }

    #[test]
    fn test_scan_options_mode() {
        let mut opts = ScanOptions::default();
        assert_eq!(opts.mode(), ScanMode::Full);
        opts.lite_fast = true;
        assert_eq!(opts.mode(), ScanMode::Lite);
    }
}

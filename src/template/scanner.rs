//! Template Scanner
//!
//! Regex pass over template and source files: per-rule compiled patterns with
//! a ReDoS guard, a hint prefilter ahead of every regex, secondary filters on
//! each hit, adjacent-line grouping, and per-file/per-rule/per-vul-type
//! deduplication. The scan is sequential; stop/pause is honored between
//! files, lines and regex evaluations.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use crate::analyzer::scanner::{extension_of, relative_path};
use crate::constants::{limits, scan};
use crate::engine::control::{Progress, ScanControl};
use crate::rules::{RuleStore, TemplateRule};
use crate::types::{Finding, ScanMode};

/// Heuristic for nested quantifiers that can blow up regex evaluation
static NESTED_QUANTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*\+[^)]*\+[^)]*\)").expect("nested quantifier heuristic compiles")
});

/// Aggregate counters kept for diagnostics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateScanStats {
    pub scanned_dirs: usize,
    pub scanned_files: usize,
    pub first_files: Vec<String>,
    pub findings: usize,
    pub effective_skip_dirs: Vec<String>,
    /// (rule name, rejected pattern) pairs
    pub bad_patterns: Vec<(String, String)>,
}

/// One rule with its compiled regexes and hint vocabulary
struct CompiledRule<'a> {
    rule: &'a TemplateRule,
    regexes: Vec<Regex>,
    /// None when the rule forces regex evaluation
    hints: Option<HashSet<String>>,
}

/// Sequential regex scanner over eligible files
pub struct TemplateScanner<'a> {
    root: &'a Path,
    rules: &'a RuleStore,
}

impl<'a> TemplateScanner<'a> {
    pub fn new(root: &'a Path, rules: &'a RuleStore) -> Self {
        Self { root, rules }
    }

    /// Extensions the walker should admit for this rule set
    pub fn rule_extensions(&self) -> HashSet<String> {
        let include: HashSet<String> = self
            .rules
            .options()
            .include_exts
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut exts = HashSet::new();
        for rule in self.rules.template_rules() {
            for ext in &rule.file_exts {
                let ext = ext.trim_start_matches('.').to_ascii_lowercase();
                if include.is_empty() || include.contains(&ext) {
                    exts.insert(ext);
                }
            }
        }
        exts
    }

    /// Run the scan over the walker-selected files
    pub fn scan(
        &self,
        files: &[PathBuf],
        control: &ScanControl,
        progress: &Progress,
    ) -> (Vec<Finding>, TemplateScanStats) {
        let mode = self.rules.options().mode();
        let mut stats = TemplateScanStats {
            effective_skip_dirs: if self.rules.options().ignore_skip_dirs {
                Vec::new()
            } else {
                scan::SKIP_DIR_PATTERNS.iter().map(|s| s.to_string()).collect()
            },
            ..Default::default()
        };

        let (compiled, ext_map) = self.compile_rules(&mut stats);
        if compiled.is_empty() {
            return (Vec::new(), stats);
        }

        let max_regex_evals = match mode {
            ScanMode::Full => scan::MAX_REGEX_EVALS_FULL,
            ScanMode::Lite => scan::MAX_REGEX_EVALS_LITE,
        };
        let per_file_rule_cap = match mode {
            ScanMode::Full => scan::PER_FILE_RULE_CAP_FULL,
            ScanMode::Lite => scan::PER_FILE_RULE_CAP_LITE,
        };
        let context_window = match mode {
            ScanMode::Full => scan::CONTEXT_WINDOW_FULL,
            ScanMode::Lite => scan::CONTEXT_WINDOW_LITE,
        };

        let mut findings: Vec<Finding> = Vec::new();
        let mut seen: HashSet<(String, String, usize)> = HashSet::new();
        let mut per_file_rule: HashMap<(String, String), usize> = HashMap::new();
        let mut file_vul_seen: HashSet<(String, String)> = HashSet::new();
        let mut dirs: HashSet<PathBuf> = HashSet::new();

        for path in files {
            if control.checkpoint() {
                break;
            }

            let ext = extension_of(path);
            let Some(lines) = read_lines(path, &ext) else {
                continue;
            };
            if lines.len() > limits::MAX_FILE_LINES {
                debug!(path = %path.display(), lines = lines.len(), "line cap exceeded, skipped");
                continue;
            }

            stats.scanned_files += 1;
            if let Some(parent) = path.parent() {
                dirs.insert(parent.to_path_buf());
            }
            if stats.first_files.len() < 5 {
                stats.first_files.push(path.display().to_string());
            }

            let rel = relative_path(self.root, path);
            let mut regex_evals = 0usize;

            // Java-related files are checked against every rule; others only
            // against the rules mapped to their extension.
            let all_indices: Vec<usize> = (0..compiled.len()).collect();
            let rule_indices: &[usize] = if scan::JAVA_RELATED_EXTS.contains(&ext.as_str()) {
                &all_indices
            } else {
                ext_map.get(&ext).map(Vec::as_slice).unwrap_or_default()
            };

            for &rule_idx in rule_indices {
                if control.should_stop() {
                    break;
                }
                let compiled_rule = &compiled[rule_idx];

                if compiled_rule.rule.name.eq_ignore_ascii_case("FORM_NO_CSRF") {
                    self.scan_csrf_blocks(
                        compiled_rule.rule,
                        &lines,
                        &rel,
                        path,
                        mode,
                        per_file_rule_cap,
                        &mut seen,
                        &mut per_file_rule,
                        &mut file_vul_seen,
                        &mut findings,
                        progress,
                    );
                    continue;
                }

                let hit_lines = self.match_rule_lines(
                    compiled_rule,
                    &lines,
                    &rel,
                    &ext,
                    context_window,
                    max_regex_evals,
                    &mut regex_evals,
                    per_file_rule_cap,
                    &per_file_rule,
                    &mut seen,
                    control,
                );

                self.emit_groups(
                    compiled_rule.rule,
                    hit_lines,
                    &rel,
                    path,
                    mode,
                    per_file_rule_cap,
                    &mut per_file_rule,
                    &mut file_vul_seen,
                    &mut findings,
                    progress,
                );
            }
        }

        progress.flush();
        stats.scanned_dirs = dirs.len();
        stats.findings = findings.len();
        (findings, stats)
    }

    /// Compile every rule's patterns, rejecting oversized or quantifier-nested
    /// regexes, and build the extension map
    fn compile_rules(
        &self,
        stats: &mut TemplateScanStats,
    ) -> (Vec<CompiledRule<'a>>, HashMap<String, Vec<usize>>) {
        let include: HashSet<String> = self
            .rules
            .options()
            .include_exts
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut compiled = Vec::new();
        let mut ext_map: HashMap<String, Vec<usize>> = HashMap::new();

        for rule in self.rules.template_rules() {
            let mut regexes = Vec::new();
            for pattern in &rule.patterns {
                if pattern.len() > limits::MAX_REGEX_LENGTH {
                    warn!(rule = %rule.name, "pattern exceeds the length cap, rejected");
                    stats.bad_patterns.push((rule.name.clone(), pattern.clone()));
                    continue;
                }
                if NESTED_QUANTIFIER.is_match(pattern) {
                    warn!(rule = %rule.name, "pattern has nested quantifiers, rejected");
                    stats.bad_patterns.push((rule.name.clone(), pattern.clone()));
                    continue;
                }
                match RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .dot_matches_new_line(true)
                    .build()
                {
                    Ok(regex) => regexes.push(regex),
                    Err(e) => {
                        debug!(rule = %rule.name, error = %e, "pattern failed to compile");
                        stats.bad_patterns.push((rule.name.clone(), pattern.clone()));
                    }
                }
            }

            let hints = if rule.force_regex {
                None
            } else {
                Some(super::hints::rule_hints(rule))
            };

            let idx = compiled.len();
            compiled.push(CompiledRule {
                rule,
                regexes,
                hints,
            });

            for ext in &rule.file_exts {
                let ext = ext.trim_start_matches('.').to_ascii_lowercase();
                if include.is_empty() || include.contains(&ext) {
                    ext_map.entry(ext).or_default().push(idx);
                }
            }
        }

        (compiled, ext_map)
    }

    /// Line pass for one rule over one file; returns `(line_no, confidence)`
    /// hits in line order
    #[allow(clippy::too_many_arguments)]
    fn match_rule_lines(
        &self,
        compiled_rule: &CompiledRule<'a>,
        lines: &[String],
        rel: &str,
        ext: &str,
        context_window: usize,
        max_regex_evals: usize,
        regex_evals: &mut usize,
        per_file_rule_cap: usize,
        per_file_rule: &HashMap<(String, String), usize>,
        seen: &mut HashSet<(String, String, usize)>,
        control: &ScanControl,
    ) -> Vec<(usize, f64)> {
        let rule = compiled_rule.rule;
        let fr_key = (rule.name.clone(), rel.to_string());
        let is_jsp = matches!(ext, "jsp" | "jspx");
        let threshold = if is_jsp { 0.25 } else { 0.30 };
        let opts = self.rules.options();

        let mut hits: Vec<(usize, f64)> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            if control.should_stop() {
                break;
            }
            if line.len() > limits::MAX_LINE_CHARS {
                continue;
            }

            let line_lower = line.to_lowercase();
            if let Some(hints) = &compiled_rule.hints
                && !super::hints::line_has_hint(&line_lower, hints)
            {
                continue;
            }

            let emitted = per_file_rule.get(&fr_key).copied().unwrap_or(0);
            if emitted >= per_file_rule_cap {
                break;
            }

            for regex in &compiled_rule.regexes {
                if control.should_stop() || *regex_evals >= max_regex_evals {
                    break;
                }
                *regex_evals += 1;

                if !regex.is_match(line) {
                    continue;
                }

                if opts.apply_must_substrings {
                    let excluded = rule
                        .exclude_substrings
                        .iter()
                        .any(|s| line_lower.contains(&s.to_lowercase()));
                    if excluded {
                        continue;
                    }
                    let required = rule
                        .must_substrings
                        .iter()
                        .all(|s| line_lower.contains(&s.to_lowercase()));
                    if !required {
                        continue;
                    }
                }

                if super::fp::is_false_positive(line, lines, line_no, context_window, rule) {
                    continue;
                }

                let context_score =
                    super::context::analyze_context(lines, line_no, context_window, rule);
                if context_score < threshold {
                    continue;
                }

                let key = (rule.name.clone(), rel.to_string(), line_no);
                if seen.contains(&key) {
                    break;
                }
                seen.insert(key);

                let mut confidence =
                    super::line_score::line_confidence(line, lines, line_no, rule, context_score);
                if is_jsp && confidence > 0.5 {
                    confidence = (confidence + 0.05).min(1.0);
                }

                hits.push((line_no, confidence));
                break;
            }
        }

        hits
    }

    /// Fold adjacent hit lines into `(start, end, max_confidence)` groups and
    /// emit one finding per group, honoring the dedup caps
    #[allow(clippy::too_many_arguments)]
    fn emit_groups(
        &self,
        rule: &TemplateRule,
        hits: Vec<(usize, f64)>,
        rel: &str,
        path: &Path,
        mode: ScanMode,
        per_file_rule_cap: usize,
        per_file_rule: &mut HashMap<(String, String), usize>,
        file_vul_seen: &mut HashSet<(String, String)>,
        findings: &mut Vec<Finding>,
        progress: &Progress,
    ) {
        if hits.is_empty() {
            return;
        }

        let mut hit_numbers: Vec<usize> = hits.iter().map(|(n, _)| *n).collect();
        hit_numbers.sort_unstable();
        let groups = fold_adjacent(&hits);

        let fr_key = (rule.name.clone(), rel.to_string());
        for (group_start, group_end, group_conf) in groups {
            let emitted = per_file_rule.get(&fr_key).copied().unwrap_or(0);
            if emitted >= per_file_rule_cap {
                break;
            }

            let vul_type = rule.vul_type().to_string();
            let file_vul_key = (rel.to_string(), vul_type.clone());
            // One finding per file per vulnerability type; first writer wins.
            if file_vul_seen.contains(&file_vul_key) {
                break;
            }
            per_file_rule.insert(fr_key.clone(), emitted + 1);
            file_vul_seen.insert(file_vul_key);

            let range = if group_start == group_end {
                format!("{rel}:{group_start}")
            } else {
                format!("{rel}:{group_start}-{group_end}")
            };
            let detail_lines: Vec<usize> = hit_numbers
                .iter()
                .copied()
                .filter(|n| (group_start..=group_end).contains(n))
                .collect();

            let severity = rule.severity.demoted_for(group_conf);
            let finding = Finding {
                vul_type,
                sink_desc: rule.desc().to_string(),
                severity,
                sink: rule.name.clone(),
                call_chains: vec![vec![range]],
                chain_count: 1,
                confidence: Some(round2(group_conf)),
                sanitized_by: Some(Vec::new()),
                sources: Some(Vec::new()),
                patterns: Some(vec![rule.name.clone()]),
                file_path: Some(rel.to_string()),
                file_path_abs: Some(path.display().to_string()),
                group_lines: Some(detail_lines),
                scan_mode: Some(mode),
            };
            findings.push(finding.clone());
            progress.push_with_heartbeat(finding, scan::PARTIAL_FLUSH_INTERVAL);
        }
    }

    /// Block-wise FORM_NO_CSRF: a POST form with no CSRF token within the
    /// next window of lines
    #[allow(clippy::too_many_arguments)]
    fn scan_csrf_blocks(
        &self,
        rule: &TemplateRule,
        lines: &[String],
        rel: &str,
        path: &Path,
        mode: ScanMode,
        per_file_rule_cap: usize,
        seen: &mut HashSet<(String, String, usize)>,
        per_file_rule: &mut HashMap<(String, String), usize>,
        file_vul_seen: &mut HashSet<(String, String)>,
        findings: &mut Vec<Finding>,
        progress: &Progress,
    ) {
        let fr_key = (rule.name.clone(), rel.to_string());
        for (idx, line) in lines.iter().enumerate() {
            if !(line.contains("<form") && line.contains("method=\"post\"")) {
                continue;
            }
            let window_end = lines.len().min(idx + scan::CSRF_FORM_WINDOW);
            let window = lines[idx..window_end].join("\n");
            if window.contains("name=\"csrf\"") || window.contains("_csrf") {
                continue;
            }

            let line_no = idx + 1;
            let key = (rule.name.clone(), rel.to_string(), line_no);
            let emitted = per_file_rule.get(&fr_key).copied().unwrap_or(0);
            let vul_type = rule.vul_type().to_string();
            let file_vul_key = (rel.to_string(), vul_type.clone());
            if seen.contains(&key)
                || emitted >= per_file_rule_cap
                || file_vul_seen.contains(&file_vul_key)
            {
                continue;
            }
            seen.insert(key);
            per_file_rule.insert(fr_key.clone(), emitted + 1);
            file_vul_seen.insert(file_vul_key);

            let finding = Finding {
                vul_type,
                sink_desc: rule.desc().to_string(),
                severity: rule.severity,
                sink: rule.name.clone(),
                call_chains: vec![vec![format!("{rel}:{line_no}")]],
                chain_count: 1,
                confidence: Some(0.8),
                sanitized_by: Some(Vec::new()),
                sources: Some(Vec::new()),
                patterns: Some(vec![rule.name.clone()]),
                file_path: Some(rel.to_string()),
                file_path_abs: Some(path.display().to_string()),
                group_lines: Some(vec![line_no]),
                scan_mode: Some(mode),
            };
            findings.push(finding.clone());
            progress.push_with_heartbeat(finding, scan::PARTIAL_FLUSH_INTERVAL);
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fold sorted hit lines into `(start, end, max_confidence)` groups of
/// consecutive line numbers
fn fold_adjacent(hits: &[(usize, f64)]) -> Vec<(usize, usize, f64)> {
    let mut numbers: Vec<usize> = hits.iter().map(|(n, _)| *n).collect();
    numbers.sort_unstable();
    let confidence_at = |line_no: usize| {
        hits.iter()
            .filter(|(n, _)| *n == line_no)
            .map(|(_, c)| *c)
            .fold(0.0f64, f64::max)
    };

    let mut groups = Vec::new();
    let Some(&first) = numbers.first() else {
        return groups;
    };
    let mut start = first;
    let mut prev = first;
    let mut max_conf = confidence_at(first);
    for &line_no in &numbers[1..] {
        if line_no == prev + 1 {
            prev = line_no;
            max_conf = max_conf.max(confidence_at(line_no));
        } else {
            groups.push((start, prev, max_conf));
            start = line_no;
            prev = line_no;
            max_conf = confidence_at(line_no);
        }
    }
    groups.push((start, prev, max_conf));
    groups
}

/// Bytes read for the printable-text fallback on `.class` files
const CLASS_FILE_PREVIEW_BYTES: usize = 10_240;

/// Read a file into lines with lossy UTF-8 decoding
///
/// `.class` files go through a printable-byte mask over a bounded preview;
/// anything without at least two resulting lines is skipped.
fn read_lines(path: &Path, ext: &str) -> Option<Vec<String>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot read file");
            return None;
        }
    };

    if ext == "class" {
        let preview = &bytes[..bytes.len().min(CLASS_FILE_PREVIEW_BYTES)];
        let masked: Vec<u8> = preview
            .iter()
            .map(|&b| {
                if (0x20..=0x7E).contains(&b) || b == b'\r' || b == b'\n' || b == b'\t' {
                    b
                } else {
                    b' '
                }
            })
            .collect();
        let text = String::from_utf8_lossy(&masked).into_owned();
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.len() < 2 {
            return None;
        }
        return Some(lines);
    }

    let text = String::from_utf8_lossy(&bytes).into_owned();
    Some(text.lines().map(str::to_string).collect())
}

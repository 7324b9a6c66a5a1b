//! Chain Scoring and Enrichment
//!
//! Assigns a confidence to each complete chain from sanitizer/source/pattern
//! evidence and length heuristics, and gathers the evidence sets reported on
//! the finding. Scores are heuristic ranks, not probabilities.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::analyzer::parser::{JavaParser, method_source};
use crate::graph::{CallGraph, ClassIndex};
use crate::rules::{MatchList, RuleStore, matcher};
use crate::types::Signature;

/// Chain nodes whose method source is scanned by the SQL-concat heuristic
const SQL_CONCAT_SCAN_NODES: usize = 3;

/// Method-source snippet cap for the SQL-concat heuristic
const SQL_CONCAT_SNIPPET_CHARS: usize = 8_000;

/// Synthetic pattern name for the textual SQL-concatenation heuristic
pub const SQL_CONCAT_TEXT: &str = "SQL_CONCAT_TEXT";

static SQL_CONCAT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let dotall = |p: &str| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .expect("SQL concat pattern compiles")
    };
    vec![
        dotall(r"\bStringBuilder\b.*append\s*\("),
        dotall(r"\bStringBuffer\b.*append\s*\("),
        RegexBuilder::new(r"sql\s*\+=\s*")
            .case_insensitive(true)
            .build()
            .expect("SQL concat pattern compiles"),
        Regex::new(r"\+\s*\w*\s*;").expect("SQL concat pattern compiles"),
        Regex::new(r"String\.format\s*\(").expect("SQL concat pattern compiles"),
    ]
});

/// Evidence gathered while enriching one chain
#[derive(Debug, Clone, Default)]
pub struct ChainEvidence {
    pub confidence: f64,
    pub sanitized_by: Vec<String>,
    pub sources: Vec<String>,
    pub patterns: Vec<String>,
}

impl ChainEvidence {
    /// The neutral result used when enrichment of a chain fails
    pub fn fallback() -> Self {
        Self {
            confidence: 0.5,
            ..Default::default()
        }
    }
}

/// Pure scoring function over the evidence counts
///
/// Starts at 1.0, applies the additive deltas in order, clamps to [0, 1].
pub fn score_chain(
    chain_len: usize,
    sanitizer_count: usize,
    source_count: usize,
    pattern_hits: &[String],
    sink_vul_type: &str,
) -> f64 {
    if chain_len == 0 {
        return 0.0;
    }

    let mut score: f64 = 1.0;

    if sanitizer_count >= 2 {
        score -= 0.5;
    } else if sanitizer_count == 1 {
        score -= 0.4;
    }

    if source_count >= 2 {
        score += 0.4;
    } else if source_count == 1 {
        score += 0.3;
    }

    if sink_vul_type.eq_ignore_ascii_case("SQLI")
        && pattern_hits
            .iter()
            .any(|p| p == "SQL_CONCAT" || p == SQL_CONCAT_TEXT)
    {
        score += 0.3;
    }

    if chain_len > 20 {
        score -= 0.1;
    } else if chain_len < 3 {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Enriches chains against the rule store, the class index and cached parses
///
/// Rule matching covers each chain node plus its direct callees: a sanitizer
/// or source is usually invoked *inside* a chain method rather than being a
/// graph node of the chain itself.
pub struct ChainScorer<'a> {
    rules: &'a RuleStore,
    index: &'a ClassIndex,
    graph: &'a CallGraph,
    parser: &'a JavaParser,
}

impl<'a> ChainScorer<'a> {
    pub fn new(
        rules: &'a RuleStore,
        index: &'a ClassIndex,
        graph: &'a CallGraph,
        parser: &'a JavaParser,
    ) -> Self {
        Self {
            rules,
            index,
            graph,
            parser,
        }
    }

    /// Chain nodes followed by every callee they invoke, deduplicated
    fn neighborhood(&self, chain: &[Signature]) -> Vec<Signature> {
        let mut sigs: Vec<Signature> = chain.to_vec();
        for node in chain {
            for callee in self.graph.callees_of(node) {
                if !sigs.contains(callee) {
                    sigs.push(callee.clone());
                }
            }
        }
        sigs
    }

    fn matches_in_neighborhood(
        &self,
        chain: &[Signature],
        lists: &[MatchList<'_>],
    ) -> Vec<String> {
        let mut found = Vec::new();
        for sig in self.neighborhood(chain) {
            for hit in matcher::matches(&sig, lists) {
                if !found.contains(&hit) {
                    found.push(hit);
                }
            }
        }
        found
    }

    /// Full enrichment of one chain: evidence sets plus the resulting score
    pub fn enrich(&self, chain: &[Signature], sink_vul_type: &str) -> ChainEvidence {
        let sanitized_by = self.sanitizers_in(chain);
        let sources = self.sources_in(chain);
        let patterns = self.pattern_hits(chain);
        let confidence = score_chain(
            chain.len(),
            sanitized_by.len(),
            sources.len(),
            &patterns,
            sink_vul_type,
        );
        ChainEvidence {
            confidence,
            sanitized_by,
            sources,
            patterns,
        }
    }

    /// Sanitizer rule names matched on the chain or its callees
    pub fn sanitizers_in(&self, chain: &[Signature]) -> Vec<String> {
        self.matches_in_neighborhood(chain, &self.rules.sanitizer_match_lists())
    }

    /// Source rule names matched on the chain or its callees
    pub fn sources_in(&self, chain: &[Signature]) -> Vec<String> {
        self.matches_in_neighborhood(chain, &self.rules.source_match_lists())
    }

    /// Pattern-rule names whose signature lists intersect the chain
    /// neighborhood, plus the textual SQL-concat heuristic
    ///
    /// Every pattern category is collected regardless of the sink's
    /// vulnerability type; only SQLI consumes the SQL_CONCAT hits in scoring.
    pub fn pattern_hits(&self, chain: &[Signature]) -> Vec<String> {
        let neighborhood = self.neighborhood(chain);
        let mut hits = Vec::new();
        for (name, entries) in self.rules.pattern_rules() {
            let shortened: Vec<Signature> = entries
                .iter()
                .filter_map(|e| Signature::parse(e))
                .map(|sig| sig.shortened())
                .collect();
            if neighborhood.iter().any(|sig| shortened.contains(sig))
                && !hits.iter().any(|h| h == name)
            {
                hits.push(name.to_string());
            }
        }
        if self.detect_sql_concat_text(chain) {
            hits.push(SQL_CONCAT_TEXT.to_string());
        }
        hits
    }

    /// Textual heuristic: SQL built by concatenation near the head of the
    /// chain
    fn detect_sql_concat_text(&self, chain: &[Signature]) -> bool {
        for sig in chain.iter().take(SQL_CONCAT_SCAN_NODES) {
            let Some(code) = self.method_snippet(sig) else {
                continue;
            };
            if SQL_CONCAT_PATTERNS.iter().any(|p| p.is_match(&code)) {
                return true;
            }
        }
        false
    }

    /// Source text of the method a signature names, capped for scanning
    fn method_snippet(&self, sig: &Signature) -> Option<String> {
        let file = self.index.file_of(sig.class_name())?;
        let ast = self.parser.parse_file(file)?;
        let code = method_source(&ast, sig.class_name(), sig.method())?;
        if code.len() <= SQL_CONCAT_SNIPPET_CHARS {
            return Some(code);
        }
        let mut end = SQL_CONCAT_SNIPPET_CHARS;
        while !code.is_char_boundary(end) {
            end -= 1;
        }
        Some(code[..end].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_chain_scores_zero() {
        assert_eq!(score_chain(0, 0, 0, &[], "SQLI"), 0.0);
    }

    #[test]
    fn test_sanitizer_deltas() {
        // Length 3 avoids the short-chain bonus.
        assert_eq!(score_chain(3, 0, 0, &[], ""), 1.0);
        assert!((score_chain(3, 1, 0, &[], "") - 0.6).abs() < 1e-9);
        assert!((score_chain(3, 2, 0, &[], "") - 0.5).abs() < 1e-9);
        assert!((score_chain(3, 5, 0, &[], "") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_source_deltas_clamped() {
        assert_eq!(score_chain(3, 0, 1, &[], ""), 1.0);
        assert!((score_chain(3, 1, 1, &[], "") - 0.9).abs() < 1e-9);
        assert!((score_chain(3, 2, 2, &[], "") - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_sql_concat_only_counts_for_sqli() {
        let hits = vec![SQL_CONCAT_TEXT.to_string()];
        assert!((score_chain(3, 1, 0, &hits, "SQLI") - 0.9).abs() < 1e-9);
        assert!((score_chain(3, 1, 0, &hits, "XSS") - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_length_heuristics() {
        assert!((score_chain(2, 1, 0, &[], "") - 0.7).abs() < 1e-9);
        assert!((score_chain(21, 1, 0, &[], "") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sql_concat_text_patterns_match() {
        let samples = [
            "StringBuilder sb = new StringBuilder(); sb.append(x);",
            "buf = new StringBuffer();\nbuf.append(name);",
            "sql += \" where id=\" + id",
            "String q = base + cond;",
            "String.format(\"select %s\", col)",
        ];
        for s in samples {
            assert!(
                SQL_CONCAT_PATTERNS.iter().any(|p| p.is_match(s)),
                "expected a concat pattern to match {s:?}"
            );
        }
        assert!(
            !SQL_CONCAT_PATTERNS
                .iter()
                .any(|p| p.is_match("stmt.executeQuery(query)"))
        );
    }

    proptest! {
        /// Adding a sanitizer hit never increases the score.
        #[test]
        fn prop_sanitizers_never_increase(
            len in 1usize..40,
            sanitizers in 0usize..5,
            sources in 0usize..5,
        ) {
            let base = score_chain(len, sanitizers, sources, &[], "SQLI");
            let more = score_chain(len, sanitizers + 1, sources, &[], "SQLI");
            prop_assert!(more <= base + 1e-9);
        }

        /// Adding a source hit never decreases the score.
        #[test]
        fn prop_sources_never_decrease(
            len in 1usize..40,
            sanitizers in 0usize..5,
            sources in 0usize..5,
        ) {
            let base = score_chain(len, sanitizers, sources, &[], "SQLI");
            let more = score_chain(len, sanitizers, sources + 1, &[], "SQLI");
            prop_assert!(more >= base - 1e-9);
        }

        /// Scores stay in the unit interval.
        #[test]
        fn prop_score_in_unit_interval(
            len in 0usize..64,
            sanitizers in 0usize..8,
            sources in 0usize..8,
        ) {
            let score = score_chain(len, sanitizers, sources, &[], "SQLI");
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}

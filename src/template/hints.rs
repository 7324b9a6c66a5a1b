//! Hint Prefilter
//!
//! Cheap containment test run on every line before any regex: a base
//! vocabulary of template/IO markers plus the literal tokens extracted from a
//! rule's own patterns. A line that contains none of a rule's hints cannot
//! match that rule's regexes in practice, so the regex engine never sees it.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::rules::TemplateRule;

/// Template/IO markers that always count as hints, lowercased
pub const BASE_HINTS: &[&str] = &[
    // Generic IO / template output
    "request.getparameter",
    "out.print",
    "out.println",
    "${",
    "<%=",
    "document.write",
    // JSP / Servlet
    "response.setheader",
    "response.addheader",
    "pagecontext.getout",
    "sendredirect",
    "http-equiv=\"refresh\"",
    "location.href",
    // Freemarker
    "<#",
    "#include",
    "#import",
    "#assign",
    "#if",
    "#list",
    // Velocity
    "$!",
    "#set",
    "#parse",
    "#foreach",
    // Thymeleaf
    "th:",
    "@{",
];

static HINT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9_.]{2,}").expect("hint token pattern compiles"));

/// Alphanumeric tokens of length ≥ 3 extracted from a pattern, lowercased
pub fn hint_words(pattern: &str) -> Vec<String> {
    HINT_WORD
        .find_iter(pattern)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

/// The full hint vocabulary for one rule
pub fn rule_hints(rule: &TemplateRule) -> HashSet<String> {
    let mut hints: HashSet<String> = BASE_HINTS.iter().map(|h| h.to_string()).collect();
    for pattern in &rule.patterns {
        hints.extend(hint_words(pattern));
    }
    hints
}

/// Whether a lowercased line contains any hint
pub fn line_has_hint(line_lower: &str, hints: &HashSet<String>) -> bool {
    hints.iter().any(|h| line_lower.contains(h))
}

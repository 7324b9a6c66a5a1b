//! Context Analyzer
//!
//! Scores the neighborhood of a regex hit: vulnerability-family indicators
//! raise the score, sanitizer and logging context lower it. The window is
//! `[line − W, line + W]`; scores start at 0.5 and clamp to [0, 1].

use crate::rules::TemplateRule;

const SQL_INDICATORS: &[&str] = &[
    "select",
    "from",
    "where",
    "insert",
    "update",
    "delete",
    "executequery",
    "preparedstatement",
];

const XSS_SINKS: &[&str] = &["out.print", "response.getwriter", "document.write", "innerhtml"];

const XSS_ENCODERS: &[&str] = &["escapehtml", "encode", "sanitize", "escape"];

const PATH_INDICATORS: &[&str] = &["../", "..\\", "getrealpath", "file", "filestream"];

const PATH_CANONICALIZERS: &[&str] = &["canonical", "normalize", "getcanonical"];

const RCE_INDICATORS: &[&str] = &["runtime.exec", "processbuilder", "command", "exec"];

const DESERIALIZE_INDICATORS: &[&str] = &["readobject", "objectinputstream", "json.parse", "fastjson"];

const EL_INDICATORS: &[&str] = &["${", "<%=", "param.", "requestscope", "sessionscope"];

const INPUT_SOURCES: &[&str] = &[
    "request.getparameter",
    "request.get",
    "request.getinputstream",
    "request.getreader",
    "request.getattribute",
    "session.getattribute",
    "param.",
    "header.",
    "cookie.",
];

const SANITIZER_KEYWORDS: &[&str] = &[
    "escapehtml",
    "htmlutils",
    "stringescapeutils",
    "owasp.encoder",
    "sanitize",
    "filter",
    "encode",
    "encodeurl",
    "encodeuri",
    "escapexml",
    "escapejavascript",
    "escapejava",
    "preparedstatement",
    "parameterized",
    "setstring",
    "setint",
    "setparameter",
    "escapelike",
    "quote",
    "canonicalize",
];

const LOG_INDICATORS: &[&str] = &["catch", "exception", "logger", "log.", "printstacktrace"];

fn count_in(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

fn any_in(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(*n))
}

/// Context score for a hit on `line_no` (1-based) with window `W` each side
pub fn analyze_context(
    lines: &[String],
    line_no: usize,
    context_window: usize,
    rule: &TemplateRule,
) -> f64 {
    if context_window == 0 || line_no < 1 || line_no > lines.len() {
        return 0.5;
    }

    let context_start = line_no.saturating_sub(context_window + 1);
    let context_end = lines.len().min(line_no + context_window);
    let context_lines = &lines[context_start..context_end];
    let context_text = context_lines.join(" ").to_lowercase();

    let mut score: f64 = 0.5;
    let vul_type = rule.vul_type().to_uppercase();
    let rule_name = rule.name.to_uppercase();

    // JSP neighborhoods make injection-style hits more credible.
    let is_jsp_context = context_lines
        .iter()
        .take(5)
        .any(|l| l.to_lowercase().contains("jsp"));
    if is_jsp_context && (vul_type.contains("XSS") || vul_type.contains("INJECTION")) {
        score += 0.1;
    }

    if vul_type.contains("SQLI") || rule_name.contains("SQL") {
        if any_in(&context_text, SQL_INDICATORS) {
            score += 0.2;
        }
        if context_text.contains("request.getparameter") || context_text.contains("request.get") {
            score += 0.2;
        }
        if context_text.contains("stringbuilder") || context_text.contains("stringbuffer") {
            score += 0.1;
        }
    }

    if vul_type.contains("XSS") {
        if any_in(&context_text, XSS_SINKS) {
            score += 0.2;
        }
        if context_text.contains("request.getparameter") {
            score += 0.2;
        }
        if any_in(&context_text, XSS_ENCODERS) {
            score -= 0.3;
        }
    }

    if vul_type.contains("PATH_TRAVERSAL") || rule_name.contains("FILE") {
        if any_in(&context_text, PATH_INDICATORS) {
            score += 0.2;
        }
        if context_text.contains("request.getparameter") {
            score += 0.2;
        }
        if any_in(&context_text, PATH_CANONICALIZERS) {
            score -= 0.3;
        }
    }

    if vul_type.contains("RCE") {
        if any_in(&context_text, RCE_INDICATORS) {
            score += 0.3;
        }
        if context_text.contains("request.getparameter") {
            score += 0.2;
        }
    }

    if vul_type.contains("UNSERIALIZE") || vul_type.contains("DESERIALIZE") || rule_name.contains("DESERIALIZE") {
        if any_in(&context_text, DESERIALIZE_INDICATORS) {
            score += 0.2;
        }
        if context_text.contains("request.getinputstream")
            || context_text.contains("request.getreader")
        {
            score += 0.2;
        }
    }

    if vul_type.contains("EL_INJECTION") || rule_name.contains("JSP") {
        if any_in(&context_text, EL_INDICATORS) {
            score += 0.15;
        }
        if context_text.contains("out.print") || context_text.contains("response.getwriter") {
            score += 0.1;
        }
    }

    // Multi-source amplifier.
    let input_count = count_in(&context_text, INPUT_SOURCES);
    if input_count >= 2 {
        score += 0.15;
    } else if input_count >= 1 {
        score += 0.10;
    }

    // Sanitizer damper, position-aware for the single-sanitizer case.
    let sanitizer_count = count_in(&context_text, SANITIZER_KEYWORDS);
    if sanitizer_count >= 2 {
        score -= 0.4;
    } else if sanitizer_count == 1 {
        let current_pos = line_no - context_start - 1;
        let first_sanitizer_pos = context_lines.iter().position(|l| {
            let lower = l.to_lowercase();
            SANITIZER_KEYWORDS.iter().any(|kw| lower.contains(kw))
        });
        if first_sanitizer_pos.is_some_and(|pos| pos < current_pos) {
            score -= 0.3;
        } else {
            score -= 0.2;
        }
    }

    // Exception handling and logging neighborhoods are usually noise.
    if any_in(&context_text, LOG_INDICATORS) {
        score -= 0.1;
    }

    // Scriptlet blocks handling request input.
    if (context_text.contains("<%") && context_text.contains("%>"))
        || context_text.contains("<jsp:")
    {
        if context_text.contains("request.getparameter") {
            score += 0.1;
        }
    }

    score.clamp(0.0, 1.0)
}

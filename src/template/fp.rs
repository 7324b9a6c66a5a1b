//! False-Positive Filter
//!
//! Suppresses regex hits that sit in comments, pure string literals, test
//! fixtures or masked-credential lines. Runs after a pattern matched and
//! before context scoring.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::rules::TemplateRule;

static MASKED_CREDENTIALS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"password\s*=\s*["']?\*+["']?"#,
        r#"secret\s*=\s*["']?\*+["']?"#,
        r#"key\s*=\s*["']?\*+["']?"#,
    ]
    .iter()
    .map(|p| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .build()
            .expect("masked credential pattern compiles")
    })
    .collect()
});

const TEST_INDICATORS: &[&str] = &["test", "mock", "stub", "fake", "dummy", "example"];

/// Template expressions that keep a quoted line interesting
const TEMPLATE_MARKERS: &[&str] = &["${", "<%=", "$!"];

/// Whether a matched line should be suppressed as a false positive
///
/// `line_no` is 1-based; `lines` is the whole file.
pub fn is_false_positive(
    line: &str,
    lines: &[String],
    line_no: usize,
    context_window: usize,
    rule: &TemplateRule,
) -> bool {
    let trimmed = line.trim();
    let line_lower = line.to_lowercase();

    // Single-line comments.
    if trimmed.starts_with("//") || trimmed.starts_with('#') {
        return true;
    }

    // Block comments spanning the line within the context window.
    if context_window > 0 && line_no >= 1 && in_comment_block(line, lines, line_no, context_window)
    {
        return true;
    }

    // A pure double-quoted literal, unless it embeds a template expression.
    let balanced =
        line.matches('"').count() % 2 == 0 && line.matches('\'').count() % 2 == 0;
    if balanced
        && trimmed.starts_with('"')
        && trimmed.ends_with('"')
        && !TEMPLATE_MARKERS.iter().any(|m| line.contains(m))
    {
        return true;
    }

    // Test fixtures, when the rule itself originates from test material.
    if TEST_INDICATORS.iter().any(|t| line_lower.contains(t)) {
        let rule_path = rule.file_path.as_deref().unwrap_or("").to_lowercase();
        if rule_path.contains("test") {
            return true;
        }
    }

    // Masked credentials like `password=***`.
    if MASKED_CREDENTIALS.iter().any(|p| p.is_match(line)) {
        return true;
    }

    false
}

/// HTML `<!-- -->` or `/* */` block open before the line without closing
fn in_comment_block(line: &str, lines: &[String], line_no: usize, context_window: usize) -> bool {
    let context_start = line_no.saturating_sub(context_window + 1);
    let context_end = lines.len().min(line_no + context_window);
    if context_start >= context_end {
        return false;
    }
    let context = lines[context_start..context_end].join("\n");

    let Some(line_pos) = context.find(line) else {
        return false;
    };
    let before = &context[..line_pos];

    if before.contains("<!--") && !before.contains("-->") {
        return true;
    }

    // Inside a block comment when the last `/*` before the line is still
    // unclosed at the line start.
    if let Some(open) = before.rfind("/*")
        && !before[open..].contains("*/")
    {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> TemplateRule {
        TemplateRule {
            name: "RCE_EXEC".into(),
            ..TemplateRule::default()
        }
    }

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_line_comment_suppressed() {
        let file = lines(&["// runtime.getRuntime().exec(userCmd)"]);
        assert!(is_false_positive(&file[0], &file, 1, 15, &rule()));
    }

    #[test]
    fn test_hash_comment_suppressed() {
        let file = lines(&["# exec(cmd)"]);
        assert!(is_false_positive(&file[0], &file, 1, 15, &rule()));
    }

    #[test]
    fn test_block_comment_suppressed() {
        let file = lines(&[
            "/*",
            " stmt.executeQuery(input)",
            "*/",
            "stmt.executeQuery(other)",
        ]);
        assert!(is_false_positive(&file[1], &file, 2, 15, &rule()));
        assert!(!is_false_positive(&file[3], &file, 4, 15, &rule()));
    }

    #[test]
    fn test_html_comment_suppressed() {
        let file = lines(&["<!--", "<%= request.getParameter(\"q\") %>", "-->"]);
        assert!(is_false_positive(&file[1], &file, 2, 15, &rule()));
    }

    #[test]
    fn test_pure_string_literal_suppressed_unless_template() {
        let file = lines(&["\"select * from users\""]);
        assert!(is_false_positive(&file[0], &file, 1, 15, &rule()));

        let file = lines(&["\"select ${param.q} from users\""]);
        assert!(!is_false_positive(&file[0], &file, 1, 15, &rule()));
    }

    #[test]
    fn test_test_indicator_requires_rule_from_test_material() {
        let file = lines(&["mockRequest.getParameter(\"q\")"]);
        assert!(!is_false_positive(&file[0], &file, 1, 15, &rule()));

        let mut test_rule = rule();
        test_rule.file_path = Some("src/test/rules.json".into());
        assert!(is_false_positive(&file[0], &file, 1, 15, &test_rule));
    }

    #[test]
    fn test_masked_credentials_suppressed() {
        let file = lines(&["password = \"****\""]);
        assert!(is_false_positive(&file[0], &file, 1, 15, &rule()));
    }

    #[test]
    fn test_live_sink_line_passes() {
        let file = lines(&["stmt.executeQuery(\"select\" + input);"]);
        assert!(!is_false_positive(&file[0], &file, 1, 15, &rule()));
    }
}

//! Line Confidence Scorer
//!
//! Refines the context score using the hit line itself: keyword density,
//! syntactic complexity, dangerous tokens for the vulnerability family, a
//! wider input/output re-check and Spring stereotype annotations.

use crate::rules::TemplateRule;

/// Wider re-check window each side of the hit line
const RECHECK_WINDOW: usize = 7;

const LINE_KEYWORDS: &[&str] = &[
    "request",
    "getparameter",
    "getinputstream",
    "response",
    "execute",
];

const DANGEROUS_TOKENS: &[(&str, &[&str])] = &[
    (
        "SQLI",
        &[
            "executequery",
            "executestatement",
            "preparedstatement",
            "createstatement",
            "executeupdate",
            "executebatch",
            "query",
            "update",
            "jdbctemplate",
            "hibernate",
        ],
    ),
    (
        "XSS",
        &[
            "print",
            "println",
            "write",
            "innerhtml",
            "getwriter",
            "out.print",
            "response.getwriter",
            "document.write",
            "eval",
        ],
    ),
    (
        "RCE",
        &["exec", "eval", "runtime", "processbuilder", "getruntime", "command"],
    ),
    (
        "PATH_TRAVERSAL",
        &[
            "../",
            "..\\",
            "filestream",
            "fileoutputstream",
            "filewriter",
            "fileinputstream",
            "filereader",
            "getrealpath",
            "getcanonicalpath",
        ],
    ),
    (
        "XXE",
        &["documentbuilder", "saxparser", "dom4j", "jdom", "xpath", "xmlreader"],
    ),
    (
        "DESERIALIZE",
        &[
            "readobject",
            "objectinputstream",
            "readresolve",
            "readunsafe",
            "fastjson",
            "jackson",
            "gson",
            "xstream",
        ],
    ),
];

const INPUT_KEYWORDS: &[&str] = &[
    "request",
    "parameter",
    "input",
    "getparameter",
    "getinputstream",
    "getattribute",
    "getheader",
    "getcookie",
    "requestparam",
    "pathvariable",
    "requestbody",
    "queryparam",
    "bodytomono",
    "getquery",
    "getpathinfo",
];

const OUTPUT_KEYWORDS: &[&str] = &[
    "response",
    "output",
    "print",
    "write",
    "send",
    "setheader",
    "getwriter",
    "sendredirect",
    "forward",
    "render",
    "view",
    "model",
];

const SPRING_STEREOTYPES: &[&str] = &[
    "@requestmapping",
    "@getmapping",
    "@postmapping",
    "@putmapping",
    "@deletemapping",
    "@requestparam",
    "@pathvariable",
    "@requestbody",
    "@modelattribute",
    "@valid",
    "@responsebody",
    "@controller",
    "@restcontroller",
    "@service",
    "@repository",
];

const COLLECTION_TOKENS: &[&str] = &["list", "array", "map", "set", "collection"];

const CAST_TOKENS: &[&str] = &["tostring", "valueof", "parse", "convert"];

fn count_in(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

/// Refine `base_score` for the hit on `line_no` (1-based)
pub fn line_confidence(
    line: &str,
    lines: &[String],
    line_no: usize,
    rule: &TemplateRule,
    base_score: f64,
) -> f64 {
    if line.is_empty() || lines.is_empty() || line_no < 1 || line_no > lines.len() {
        return base_score;
    }

    let mut score = base_score;
    let line_lower = line.to_lowercase();
    let vul_type = rule.vul_type().to_uppercase();

    // Keyword density on the line itself.
    if count_in(&line_lower, LINE_KEYWORDS) >= 2 {
        score += 0.1;
    }

    // Syntactic complexity.
    if line.matches('(').count() > 3 || line.matches('.').count() > 5 {
        score += 0.05;
    }

    // Concatenation feeding a SQL sink.
    if (line.contains('+') || line_lower.contains("concat") || line_lower.contains("append"))
        && vul_type.contains("SQL")
    {
        score += 0.1;
    }

    // Dangerous tokens for the vulnerability family.
    for (family, tokens) in DANGEROUS_TOKENS {
        if vul_type.contains(family) {
            let count = count_in(&line_lower, tokens);
            if count >= 2 {
                score += 0.25;
            } else if count >= 1 {
                score += 0.15;
            }
        }
    }

    // Wider input/output re-check around interior lines.
    if line_no >= RECHECK_WINDOW && line_no < lines.len().saturating_sub(RECHECK_WINDOW) {
        let start = line_no.saturating_sub(RECHECK_WINDOW);
        let end = lines.len().min(line_no + RECHECK_WINDOW + 1);
        let block = lines[start..end].join(" ").to_lowercase();

        let input_count = count_in(&block, INPUT_KEYWORDS);
        let output_count = count_in(&block, OUTPUT_KEYWORDS);
        if input_count >= 2 && output_count >= 1 {
            score += 0.3;
        } else if input_count >= 1 && output_count >= 1 {
            score += 0.2;
        } else if input_count >= 2 {
            score += 0.15;
        } else if input_count >= 1 || output_count >= 1 {
            score += 0.1;
        }

        let spring_count = count_in(&block, SPRING_STEREOTYPES);
        if spring_count >= 2 {
            score += 0.1;
        } else if spring_count >= 1 {
            score += 0.05;
        }
    }

    // Returning user input directly.
    if line_lower.contains("return")
        && ["request", "parameter", "input", "getparameter"]
            .iter()
            .any(|s| line_lower.contains(s))
    {
        score += 0.1;
    }

    // User input flowing into collections.
    if COLLECTION_TOKENS.iter().any(|t| line_lower.contains(t))
        && (line_lower.contains("getparameter") || line_lower.contains("request"))
    {
        score += 0.05;
    }

    // User input through conversions.
    if CAST_TOKENS.iter().any(|t| line_lower.contains(t))
        && (line_lower.contains("request") || line_lower.contains("parameter"))
    {
        score += 0.05;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(vul_type: &str) -> TemplateRule {
        TemplateRule {
            name: "R".into(),
            vul_type: Some(vul_type.into()),
            ..TemplateRule::default()
        }
    }

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_out_of_range_returns_base() {
        let file = lines(&["x"]);
        assert_eq!(line_confidence("x", &file, 5, &rule("XSS"), 0.4), 0.4);
        assert_eq!(line_confidence("", &file, 1, &rule("XSS"), 0.4), 0.4);
    }

    #[test]
    fn test_dangerous_tokens_raise_score() {
        let line = "stmt.executeQuery(query);";
        let file = lines(&[line]);
        let score = line_confidence(line, &file, 1, &rule("SQLI"), 0.5);
        // executequery + query: two dangerous tokens.
        assert!(score >= 0.75, "score {score}");
    }

    #[test]
    fn test_sql_concat_bonus() {
        let line = "String sql = base + cond;";
        let file = lines(&[line]);
        let with_sql = line_confidence(line, &file, 1, &rule("SQLI"), 0.5);
        let with_xss = line_confidence(line, &file, 1, &rule("XSS"), 0.5);
        assert!(with_sql > with_xss);
    }

    #[test]
    fn test_return_of_user_input() {
        let line = "return request.getParameter(\"q\");";
        let file = lines(&[line]);
        let score = line_confidence(line, &file, 1, &rule("OTHER"), 0.5);
        let neutral = line_confidence("return value;", &lines(&["return value;"]), 1, &rule("OTHER"), 0.5);
        assert!(score > neutral);
    }

    #[test]
    fn test_wide_recheck_applies_to_interior_lines() {
        let mut texts = vec!["int pad;"; 20];
        texts[9] = "String v = request.getParameter(\"q\");";
        texts[10] = "out.print(v);";
        let file = lines(&texts);
        let score = line_confidence(&file[10], &file, 11, &rule("XSS"), 0.5);
        // print is a dangerous XSS token; the recheck sees input + output.
        assert!(score >= 0.8, "score {score}");
    }

    proptest! {
        /// The scorer never leaves the unit interval for any base in [0, 1].
        #[test]
        fn prop_confidence_clamped(base in 0.0f64..=1.0) {
            let file = vec!["stmt.executeQuery(q + r); out.print(x);".to_string()];
            let score = line_confidence(&file[0], &file, 1, &rule("SQLI"), base);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}

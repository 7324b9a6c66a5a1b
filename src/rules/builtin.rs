//! Built-in Template Augments
//!
//! A small set of template rules shipped with the engine and appended to the
//! loaded bundle on request. They cover JSP/EL, Freemarker, Velocity and
//! Thymeleaf output sinks that most external bundles miss.

use crate::types::Severity;

use super::model::TemplateRule;

fn rule(
    name: &str,
    vul_type: &str,
    desc: &str,
    severity: Severity,
    file_exts: &[&str],
    patterns: &[&str],
) -> TemplateRule {
    TemplateRule {
        name: name.to_string(),
        vul_type: Some(vul_type.to_string()),
        desc: Some(desc.to_string()),
        severity,
        file_exts: file_exts.iter().map(|e| e.to_string()).collect(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        ..TemplateRule::default()
    }
}

/// The built-in augment set, in bundle order
pub fn template_augments() -> Vec<TemplateRule> {
    vec![
        rule(
            "JSP_EL_RAW_PARAM_OUTPUT",
            "XSS",
            "EL emits a request-scoped variable without encoding",
            Severity::Medium,
            &["jsp", "jspx", "html"],
            &[
                r"\$\{\s*param\.",
                r"\$\{\s*requestScope\.",
                r"\$\{\s*sessionScope\.",
                r"\$\{\s*header\.",
            ],
        ),
        rule(
            "JSP_SCRIPTLET_PRINT_PARAM",
            "XSS",
            "scriptlet prints request input without encoding",
            Severity::High,
            &["jsp", "jspx"],
            &[r"out\.(print|println)\s*\(", r"request\.getParameter\s*\("],
        ),
        rule(
            "JSP_HEADER_REDIRECT",
            "REDIRECT",
            "unvalidated redirect via Location/Refresh",
            Severity::Medium,
            &["jsp", "jspx", "html"],
            &[
                r#"response\.setHeader\s*\(\s*"Location"\s*,"#,
                r#"http-equiv="refresh""#,
                r"sendRedirect\s*\(",
                r"location\.href",
            ],
        ),
        rule(
            "JSP_MULTIPART_TRANSFER_TO",
            "FILE_WRITE",
            "uploaded part written directly, path/extension not validated",
            Severity::High,
            &["jsp", "jspx"],
            &[r"MultipartFile\.transferTo\s*\(", r"Part\.write\s*\("],
        ),
        rule(
            "JSP_PATH_TRAVERSAL_READ",
            "PATH_TRAVERSAL",
            "file read built from request parameters",
            Severity::High,
            &["jsp", "jspx"],
            &[
                r"(FileInputStream|Files\.(readAllBytes|newInputStream)|Paths\.get)\s*\([^\)]*request\.getParameter",
            ],
        ),
        rule(
            "JSP_PATH_TRAVERSAL_WRITE",
            "PATH_TRAVERSAL",
            "file write built from request parameters",
            Severity::Critical,
            &["jsp", "jspx"],
            &[r"(FileOutputStream|Files\.write)\s*\([^\)]*request\.getParameter"],
        ),
        rule(
            "FREEMARKER_EVAL",
            "SSTI",
            "dynamic ?eval of template data",
            Severity::High,
            &["ftl"],
            &[r"\?eval"],
        ),
        rule(
            "FREEMARKER_INCLUDE_DYNAMIC",
            "FILE_INCLUDE",
            "include/import target is interpolated",
            Severity::High,
            &["ftl"],
            &[r"<#include\s+\$\{", r"<#import\s+\$\{"],
        ),
        rule(
            "VELOCITY_PARSE_DYNAMIC",
            "FILE_INCLUDE",
            "#parse/#include target is variable-controlled",
            Severity::High,
            &["vm"],
            &[r"#parse\s*\(\s*\$", r"#include\s*\(\s*\$"],
        ),
        rule(
            "THYMELEAF_UTEXT",
            "XSS",
            "th:utext renders unescaped output",
            Severity::High,
            &["html", "jsp", "jspx"],
            &["th:utext"],
        ),
        rule(
            "FORM_NO_CSRF",
            "CSRF",
            "POST form without a CSRF token field",
            Severity::Medium,
            &["jsp", "jspx", "html"],
            &[r#"<form[^>]*method="post""#],
        ),
    ]
}

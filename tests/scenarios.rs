//! End-to-end scenarios over temporary Java projects.

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use javelin::{Engine, RuleStore, Severity};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn store(value: serde_json::Value) -> RuleStore {
    RuleStore::from_value(value).unwrap()
}

fn sqli_bundle() -> serde_json::Value {
    json!({
        "sink_rules": [{
            "sink_name": "SQLI",
            "sink_desc": "JDBC statement execution",
            "severity_level": "High",
            "sinks": ["java.sql.Statement:executeQuery"]
        }]
    })
}

fn controller_source() -> &'static str {
    r#"
    class A {
        Svc svc;
        @GetMapping("/h")
        public String h(String p) { svc.q(p); return "ok"; }
    }
    "#
}

/// S1: a GetMapping handler feeding request input into executeQuery through
/// one service hop yields a single high-confidence SQLI finding.
#[test]
fn s1_sqli_chain() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/A.java", controller_source());
    write(
        temp.path(),
        "src/Svc.java",
        r#"
        class Svc {
            Statement stmt;
            public void q(String s) throws Exception {
                stmt.executeQuery("select * from t where x=" + s);
            }
        }
        "#,
    );

    let mut rules = store(sqli_bundle());
    rules.options_mut().disable_template_scan = true;
    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    let findings = engine.find();

    assert_eq!(findings.len(), 1);
    let f = &findings[0];
    assert_eq!(f.vul_type, "SQLI");
    assert_eq!(f.severity, Severity::High);
    assert_eq!(f.chain_count, 1);
    assert_eq!(
        f.call_chains,
        vec![vec![
            "A:h".to_string(),
            "Svc:q".to_string(),
            "Statement:executeQuery".to_string(),
        ]]
    );
    assert!(f.confidence.unwrap() > 0.8, "confidence {:?}", f.confidence);
}

/// S2: the same chain through a known sanitizer drops the confidence and
/// reports the sanitizer by name.
#[test]
fn s2_sanitized_chain() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/A.java", controller_source());
    write(
        temp.path(),
        "src/Svc.java",
        r#"
        class Svc {
            Statement stmt;
            Encoder encoder;
            public void q(String s) throws Exception {
                String safe = encoder.escapeSql(s);
                stmt.executeQuery("select * from t where x=" + safe);
            }
        }
        "#,
    );

    let mut bundle = sqli_bundle();
    bundle["sanitizer_rules"] = json!([{
        "sanitizer_name": "escapeSql",
        "sanitizers": ["Encoder:escapeSql"]
    }]);
    let mut rules = store(bundle);
    rules.options_mut().disable_template_scan = true;

    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    let findings = engine.find();

    assert_eq!(findings.len(), 1);
    let f = &findings[0];
    assert!(f.confidence.unwrap() <= 0.6, "confidence {:?}", f.confidence);
    assert_eq!(f.sanitized_by.as_deref(), Some(&["escapeSql".to_string()][..]));
}

/// S3: a sink with no annotated caller produces no call-graph findings.
#[test]
fn s3_no_entry_point() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "src/Batch.java",
        r#"
        class Batch {
            Statement stmt;
            public void tick(String job) throws Exception {
                stmt.executeQuery(job);
            }
        }
        "#,
    );

    let mut rules = store(sqli_bundle());
    rules.options_mut().disable_template_scan = true;
    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    assert!(engine.find().is_empty());
}

/// S4: a JSP scriptlet echoing a request parameter is reported by the
/// template pass with the hit line and a solid confidence.
#[test]
fn s4_template_xss() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "web/search.jsp",
        "<html>\n<%= request.getParameter(\"q\") %>\n</html>\n",
    );

    let rules = store(json!({
        "sink_rules": [],
        "template_rules": [{
            "name": "JSP_SCRIPTLET_PRINT_PARAM",
            "vul_type": "XSS",
            "desc": "scriptlet prints request input",
            "severity": "High",
            "file_exts": ["jsp", "jspx"],
            "patterns": [r"request\.getParameter\s*\("]
        }]
    }));
    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    let findings = engine.find();

    assert_eq!(findings.len(), 1);
    let f = &findings[0];
    assert_eq!(f.severity, Severity::High);
    assert_eq!(f.file_path.as_deref(), Some("web/search.jsp"));
    assert!(f.group_lines.as_ref().unwrap().contains(&2));
    assert!(f.confidence.unwrap() >= 0.6, "confidence {:?}", f.confidence);
}

/// S5: a commented-out exec call never produces an RCE finding.
#[test]
fn s5_comment_false_positive() {
    let temp = TempDir::new().unwrap();
    let mut body = String::from("class Job {\n");
    for _ in 0..40 {
        body.push_str("    // padding\n");
    }
    body.push_str("    // runtime.getRuntime().exec(userCmd)\n");
    body.push_str("}\n");
    write(temp.path(), "src/Job.java", &body);

    let rules = store(json!({
        "sink_rules": [],
        "template_rules": [{
            "name": "RCE_EXEC",
            "vul_type": "RCE",
            "desc": "runtime command execution",
            "severity": "Critical",
            "file_exts": ["java"],
            "patterns": [r"getRuntime\(\)\.exec"]
        }]
    }));
    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    assert!(engine.find().is_empty());
}

/// S6: a POST form without a CSRF token yields exactly one finding at
/// confidence 0.8.
#[test]
fn s6_form_no_csrf() {
    let temp = TempDir::new().unwrap();
    let mut body = String::from("<html>\n<form method=\"post\" action=\"/save\">\n");
    for i in 0..15 {
        body.push_str(&format!("  <input name=\"f{i}\"/>\n"));
    }
    body.push_str("</form>\n</html>\n");
    write(temp.path(), "web/edit.jsp", &body);

    let rules = store(json!({
        "sink_rules": [],
        "template_rules": [{
            "name": "FORM_NO_CSRF",
            "vul_type": "CSRF",
            "desc": "POST form without a CSRF token",
            "severity": "Medium",
            "file_exts": ["jsp"],
            "patterns": [r#"<form[^>]*method="post""#]
        }]
    }));
    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    let findings = engine.find();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].confidence, Some(0.8));
    assert_eq!(findings[0].group_lines.as_deref(), Some(&[2][..]));
}

/// Template findings appear once per (file, vul_type) even when several
/// rules of the same type match, and a second run is identical.
#[test]
fn template_scan_idempotent_and_deduplicated() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "web/page.jsp",
        "<%= request.getParameter(\"a\") %>\n<p>x</p>\n${param.b}\n",
    );

    let bundle = json!({
        "sink_rules": [],
        "template_rules": [
            {
                "name": "JSP_SCRIPTLET_PRINT_PARAM",
                "vul_type": "XSS",
                "severity": "High",
                "file_exts": ["jsp"],
                "patterns": [r"request\.getParameter\s*\("]
            },
            {
                "name": "JSP_EL_RAW_PARAM_OUTPUT",
                "vul_type": "XSS",
                "severity": "Medium",
                "file_exts": ["jsp"],
                "patterns": [r"\$\{\s*param\."]
            }
        ]
    });

    let run = |bundle: serde_json::Value| {
        let engine = Engine::new(temp.path(), store(bundle)).unwrap();
        engine.build();
        engine.find()
    };

    let first = run(bundle.clone());
    let second = run(bundle);

    assert_eq!(first.len(), 1, "one XSS finding per file");
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

/// Once stop is requested, no new findings are appended.
#[test]
fn stop_halts_before_new_findings() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/A.java", controller_source());
    write(
        temp.path(),
        "src/Svc.java",
        r#"
        class Svc {
            Statement stmt;
            public void q(String s) throws Exception { stmt.executeQuery(s); }
        }
        "#,
    );

    let rules = store(sqli_bundle());
    let engine = Engine::new(temp.path(), rules).unwrap();
    engine.build();
    engine.control().request_stop();
    assert!(engine.find().is_empty());
    assert!(engine.partial_results().is_empty());
}

/// The depth gap in [10, 15) is honored as configured: a chain needing 12
/// hops is found at depth 12 but not at the floor-exempt depth 10.
#[test]
fn configured_depth_between_cutoff_and_floor_is_used_verbatim() {
    let temp = TempDir::new().unwrap();
    // Entry -> H1 -> ... -> H11 -> sink: 12 reverse hops from the sink.
    let mut chain = String::new();
    chain.push_str(
        r#"
        class Entry {
            H1 h1;
            @GetMapping("/x")
            public void handle(String p) { h1.m1(p); }
        }
        "#,
    );
    for i in 1..11 {
        chain.push_str(&format!(
            r#"
            class H{i} {{
                H{next} next;
                public void m{i}(String p) {{ next.m{next}(p); }}
            }}
            "#,
            i = i,
            next = i + 1,
        ));
    }
    chain.push_str(
        r#"
        class H11 {
            Statement stmt;
            public void m11(String p) throws Exception { stmt.executeQuery(p); }
        }
        "#,
    );
    // One declaration per file keeps each unit small.
    for (idx, decl) in chain.split("class ").filter(|s| !s.trim().is_empty()).enumerate() {
        write(temp.path(), &format!("src/C{idx}.java"), &format!("class {decl}"));
    }

    let run_with_depth = |depth: usize| {
        let mut rules = store(sqli_bundle());
        rules.options_mut().disable_template_scan = true;
        rules.options_mut().depth = Some(depth);
        let engine = Engine::new(temp.path(), rules).unwrap();
        engine.build();
        engine.find()
    };

    assert!(run_with_depth(10).is_empty(), "12 hops exceed depth 10");
    assert_eq!(run_with_depth(12).len(), 1, "depth 12 reaches the entry point");
}

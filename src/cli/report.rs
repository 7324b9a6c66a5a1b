//! Terminal Report Rendering
//!
//! Severity-colored summary of a scan report for the terminal, plus the JSON
//! form collaborators consume.

use console::style;

use crate::engine::ScanReport;
use crate::types::{Finding, Result, Severity};

/// Output shape selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}', expected text or json")),
        }
    }
}

/// Print the report in the requested format
pub fn print_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => print!("{}", render_text(report)),
    }
    Ok(())
}

/// Human-readable rendering of the report
pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Scanned {} Java files ({} parsed, {:.1} files/min), {} classes, {} call edges in {} ms\n",
        report.build.total_files,
        report.build.parsed_files,
        report.build.rate_per_min,
        report.build.classes,
        report.build.call_edges,
        report.duration_ms,
    ));
    if let Some(template) = &report.template_scan {
        out.push_str(&format!(
            "Template pass: {} files in {} directories, {} findings\n",
            template.scanned_files, template.scanned_dirs, template.findings,
        ));
        if !template.bad_patterns.is_empty() {
            out.push_str(&format!(
                "  {} pattern(s) rejected by the complexity guard\n",
                template.bad_patterns.len()
            ));
        }
    }

    if report.findings.is_empty() {
        out.push_str(&format!("{}\n", style("No findings.").green()));
        return out;
    }

    out.push_str(&format!("\n{} finding(s):\n", report.findings.len()));
    for finding in &report.findings {
        out.push_str(&render_finding(finding));
    }
    out
}

fn render_finding(finding: &Finding) -> String {
    let severity = match finding.severity {
        Severity::Critical => style("Critical").red().bold(),
        Severity::High => style("High").red(),
        Severity::Medium => style("Medium").yellow(),
        Severity::Low => style("Low").dim(),
    };

    let mut out = format!(
        "  [{severity}] {} — {} ({})",
        finding.vul_type, finding.sink, finding.sink_desc
    );
    if let Some(confidence) = finding.confidence {
        out.push_str(&format!(" confidence={confidence:.2}"));
    }
    out.push('\n');

    if let Some(file_path) = &finding.file_path {
        let lines = finding
            .group_lines
            .as_ref()
            .map(|l| {
                l.iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        out.push_str(&format!("      {file_path}:{lines}\n"));
    } else {
        for chain in &finding.call_chains {
            out.push_str(&format!("      {}\n", chain.join(" -> ")));
        }
    }

    if let Some(sanitized_by) = &finding.sanitized_by
        && !sanitized_by.is_empty()
    {
        out.push_str(&format!("      sanitized by: {}\n", sanitized_by.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BuildStats;
    use chrono::Utc;

    fn report(findings: Vec<Finding>) -> ScanReport {
        ScanReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            duration_ms: 12,
            build: BuildStats::default(),
            findings,
            template_scan: None,
        }
    }

    fn finding() -> Finding {
        Finding {
            vul_type: "SQLI".into(),
            sink_desc: "JDBC statement execution".into(),
            severity: Severity::High,
            sink: "Statement:executeQuery".into(),
            call_chains: vec![vec!["A:h".into(), "Svc:q".into(), "Statement:executeQuery".into()]],
            chain_count: 1,
            confidence: Some(0.9),
            sanitized_by: Some(vec![]),
            sources: Some(vec![]),
            patterns: Some(vec![]),
            file_path: None,
            file_path_abs: None,
            group_lines: None,
            scan_mode: None,
        }
    }

    #[test]
    fn test_render_empty_report() {
        let text = render_text(&report(vec![]));
        assert!(text.contains("No findings."));
    }

    #[test]
    fn test_render_chain_finding() {
        let text = render_text(&report(vec![finding()]));
        assert!(text.contains("SQLI"));
        assert!(text.contains("A:h -> Svc:q -> Statement:executeQuery"));
        assert!(text.contains("confidence=0.90"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}

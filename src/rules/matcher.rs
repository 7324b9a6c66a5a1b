//! Signature Matching
//!
//! Matches a call-graph signature against sink/source/sanitizer entry lists.
//! Classes compare equal on the full name or on short-name equivalence (last
//! dotted segment); the method half of an entry may list alternatives as
//! `method1|method2`.

use tracing::debug;

use crate::types::Signature;

/// One rule's entries plus the name reported on a hit
///
/// `display_name` is the rule's sanitizer/source/sink name; when a rule
/// carries none, the raw matching entry is reported instead.
#[derive(Debug, Clone, Copy)]
pub struct MatchList<'a> {
    pub display_name: &'a str,
    pub entries: &'a [String],
}

/// Check one signature against one `Class:method` entry
fn entry_matches(sig: &Signature, entry: &str) -> bool {
    let Some((entry_class, entry_methods)) = entry.split_once(':') else {
        debug!(entry, "rule entry is not Class:method, skipping");
        return false;
    };
    let entry_class = entry_class.trim();
    let entry_methods = entry_methods.trim();
    if entry_class.is_empty() || entry_methods.is_empty() {
        return false;
    }

    let cls = sig.class_name();
    let cls_short = sig.short_class();
    let entry_short = entry_class.rsplit('.').next().unwrap_or_default();
    if cls != entry_class && cls_short != entry_short {
        return false;
    }

    entry_methods
        .split('|')
        .any(|m| m.trim() == sig.method())
}

/// Names of all rules in `lists` that match `sig`, deduplicated in hit order
pub fn matches(sig: &Signature, lists: &[MatchList<'_>]) -> Vec<String> {
    let mut hits: Vec<String> = Vec::new();
    if sig.method().is_empty() {
        return hits;
    }

    for list in lists {
        for entry in list.entries {
            if entry_matches(sig, entry) {
                let name = if list.display_name.is_empty() {
                    entry.as_str()
                } else {
                    list.display_name
                };
                if !hits.iter().any(|h| h == name) {
                    hits.push(name.to_string());
                }
            }
        }
    }

    hits
}

/// Expand a sink entry into concrete short-named sink signatures
///
/// `java.sql.Statement:executeQuery|executeUpdate` becomes
/// `Statement:executeQuery` and `Statement:executeUpdate`.
pub fn expand_sink_entry(entry: &str) -> Vec<Signature> {
    let Some((class_name, methods)) = entry.split_once(':') else {
        debug!(entry, "sink entry is not Class:method, skipping");
        return Vec::new();
    };
    let short = class_name.trim().rsplit('.').next().unwrap_or_default();
    if short.is_empty() {
        return Vec::new();
    }
    methods
        .split('|')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| Signature::new(short, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list<'a>(name: &'a str, entries: &'a [String]) -> MatchList<'a> {
        MatchList {
            display_name: name,
            entries,
        }
    }

    #[test]
    fn test_short_name_equivalence_both_ways() {
        let entries = vec!["com.example.A.B:m".to_string()];
        let sig = Signature::parse("B:m").unwrap();
        assert_eq!(matches(&sig, &[list("hit", &entries)]), vec!["hit"]);

        let entries = vec!["B:m".to_string()];
        let sig = Signature::parse("pkg.A.B:m").unwrap();
        assert_eq!(matches(&sig, &[list("hit", &entries)]), vec!["hit"]);
    }

    #[test]
    fn test_method_alternation() {
        let entries = vec!["Statement:executeQuery|executeUpdate".to_string()];
        let lists = [list("sql", &entries)];

        let hit = Signature::parse("Statement:executeUpdate").unwrap();
        assert_eq!(matches(&hit, &lists), vec!["sql"]);

        let miss = Signature::parse("Statement:executeBatch").unwrap();
        assert!(matches(&miss, &lists).is_empty());
    }

    #[test]
    fn test_hit_name_falls_back_to_entry() {
        let entries = vec!["Encoder:escapeSql".to_string()];
        let sig = Signature::parse("Encoder:escapeSql").unwrap();
        assert_eq!(
            matches(&sig, &[list("", &entries)]),
            vec!["Encoder:escapeSql"]
        );
    }

    #[test]
    fn test_hits_deduplicated() {
        let a = vec!["Encoder:escape".to_string()];
        let b = vec!["util.Encoder:escape".to_string()];
        let sig = Signature::parse("Encoder:escape").unwrap();
        let hits = matches(&sig, &[list("enc", &a), list("enc", &b)]);
        assert_eq!(hits, vec!["enc"]);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let entries = vec!["not-a-signature".to_string(), " : ".to_string()];
        let sig = Signature::parse("A:m").unwrap();
        assert!(matches(&sig, &[list("x", &entries)]).is_empty());
    }

    #[test]
    fn test_expand_sink_entry() {
        let sigs = expand_sink_entry("java.sql.Statement:executeQuery|executeUpdate");
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].as_str(), "Statement:executeQuery");
        assert_eq!(sigs[1].as_str(), "Statement:executeUpdate");

        assert!(expand_sink_entry("garbage").is_empty());
    }
}

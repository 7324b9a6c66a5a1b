//! Rule Store
//!
//! Loads the primary rule bundle plus any number of overlay bundles and
//! exposes read-only accessors per category.
//!
//! Merge semantics: lists under identical keys are concatenated, never
//! deduplicated. Overlay documents may spell their keys `enhanced_*` or
//! `comprehensive_rules`; both map onto the same categories.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::matcher::MatchList;
use super::model::{
    RuleBundle, SanitizerRule, ScanOptions, SinkRule, SourceRule, TemplateRule,
};
use crate::types::{JavelinError, Result};

/// Loaded and merged rule bundles plus the engine flags that travel with them
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    bundle: RuleBundle,
    options: ScanOptions,
}

impl RuleStore {
    /// Load the primary bundle from a JSON file
    ///
    /// The top level must be a JSON object; a missing `sink_rules` key is
    /// tolerated with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| JavelinError::rules_load(path.display().to_string(), e.to_string()))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| JavelinError::rules_load(path.display().to_string(), e.to_string()))?;
        let store = Self::from_value(value)?;
        info!(path = %path.display(), "loaded rule bundle");
        Ok(store)
    }

    /// Build a store from an already-decoded JSON document
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(JavelinError::validation(
                "rule bundle must be a JSON object at the top level",
            ));
        }
        if value.get("sink_rules").is_none() {
            warn!("rule bundle has no sink_rules key");
        }

        let bundle: RuleBundle = serde_json::from_value(value)?;
        let mut options = ScanOptions::default();
        options.depth = bundle.depth;
        options.max_seconds = bundle.max_seconds;

        Ok(Self { bundle, options })
    }

    /// Merge an overlay bundle file into this store
    pub fn merge_overlay_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| JavelinError::rules_load(path.display().to_string(), e.to_string()))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| JavelinError::rules_load(path.display().to_string(), e.to_string()))?;
        self.merge_overlay_value(&value)?;
        info!(path = %path.display(), "merged rule overlay");
        Ok(())
    }

    /// Concatenate every recognized category from an overlay document
    pub fn merge_overlay_value(&mut self, value: &Value) -> Result<()> {
        if !value.is_object() {
            return Err(JavelinError::validation(
                "rule overlay must be a JSON object at the top level",
            ));
        }

        merge_list::<SinkRule>(value, &["sink_rules", "enhanced_sink_rules"], &mut |r| {
            self.bundle.sink_rules.push(r)
        });
        merge_list::<SourceRule>(value, &["source_rules", "enhanced_source_rules"], &mut |r| {
            self.bundle.source_rules.push(r)
        });
        merge_list::<SanitizerRule>(
            value,
            &["sanitizer_rules", "enhanced_sanitizer_rules"],
            &mut |r| self.bundle.sanitizer_rules.push(r),
        );
        merge_list::<TemplateRule>(
            value,
            &[
                "template_rules",
                "enhanced_template_rules",
                "comprehensive_rules",
            ],
            &mut |r| self.bundle.template_rules.push(r),
        );

        if let Some(patterns) = value.get("pattern_rules").and_then(Value::as_object) {
            for (name, sigs) in patterns {
                if let Ok(sigs) = serde_json::from_value::<Vec<String>>(sigs.clone()) {
                    self.bundle
                        .pattern_rules
                        .entry(name.clone())
                        .or_default()
                        .extend(sigs);
                }
            }
        }

        if let Some(depth) = value.get("depth").and_then(Value::as_u64) {
            self.options.depth = Some(depth as usize);
        }
        if let Some(secs) = value.get("max_seconds").and_then(Value::as_u64) {
            self.options.max_seconds = Some(secs);
        }

        Ok(())
    }

    /// Append the built-in template augment set
    pub fn with_builtin_augments(mut self) -> Self {
        self.bundle
            .template_rules
            .extend(super::builtin::template_augments());
        self
    }

    /// Keep only sink rules whose `sink_name` appears in `names`
    pub fn retain_sinks(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.bundle
            .sink_rules
            .retain(|r| names.iter().any(|n| n == &r.sink_name));
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn sink_rules(&self) -> &[SinkRule] {
        &self.bundle.sink_rules
    }

    pub fn source_rules(&self) -> &[SourceRule] {
        &self.bundle.source_rules
    }

    pub fn sanitizer_rules(&self) -> &[SanitizerRule] {
        &self.bundle.sanitizer_rules
    }

    pub fn pattern_rules(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.bundle
            .pattern_rules
            .iter()
            .map(|(name, sigs)| (name.as_str(), sigs.as_slice()))
    }

    pub fn template_rules(&self) -> &[TemplateRule] {
        &self.bundle.template_rules
    }

    /// Sanitizer entries shaped for the matcher
    pub fn sanitizer_match_lists(&self) -> Vec<MatchList<'_>> {
        self.bundle
            .sanitizer_rules
            .iter()
            .map(|r| MatchList {
                display_name: &r.sanitizer_name,
                entries: &r.sanitizers,
            })
            .collect()
    }

    /// Source entries shaped for the matcher
    pub fn source_match_lists(&self) -> Vec<MatchList<'_>> {
        self.bundle
            .source_rules
            .iter()
            .map(|r| MatchList {
                display_name: &r.source_name,
                entries: &r.sources,
            })
            .collect()
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ScanOptions {
        &mut self.options
    }
}

/// Decode `value[key]` as a rule list for each key spelling and feed each
/// well-formed entry to `push`; malformed entries are skipped at debug level
fn merge_list<T: serde::de::DeserializeOwned>(
    value: &Value,
    keys: &[&str],
    push: &mut impl FnMut(T),
) {
    for key in keys {
        let Some(items) = value.get(*key).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            match serde_json::from_value::<T>(item.clone()) {
                Ok(rule) => push(rule),
                Err(e) => debug!(key, error = %e, "skipping malformed overlay rule"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_store() -> RuleStore {
        RuleStore::from_value(json!({
            "sink_rules": [{
                "sink_name": "SQLI",
                "sink_desc": "JDBC statement execution",
                "severity_level": "High",
                "sinks": ["Statement:executeQuery"]
            }],
            "template_rules": [{"name": "A", "patterns": ["x"]}],
            "depth": 8
        }))
        .unwrap()
    }

    #[test]
    fn test_load_rejects_non_object() {
        assert!(RuleStore::from_value(json!([1, 2])).is_err());
        assert!(RuleStore::from_value(json!("rules")).is_err());
    }

    #[test]
    fn test_depth_flows_into_options() {
        let store = base_store();
        assert_eq!(store.options().depth, Some(8));
    }

    #[test]
    fn test_overlay_concatenates_without_dedup() {
        let mut store = base_store();
        store
            .merge_overlay_value(&json!({
                "sink_rules": [{
                    "sink_name": "SQLI",
                    "sinks": ["Statement:executeQuery"]
                }],
                "enhanced_template_rules": [{"name": "B", "patterns": ["y"]}],
                "comprehensive_rules": [{"name": "C", "patterns": ["z"]}]
            }))
            .unwrap();

        // Same sink twice: concatenation, no dedup.
        assert_eq!(store.sink_rules().len(), 2);
        let names: Vec<_> = store.template_rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_overlay_merges_pattern_rules_under_same_key() {
        let mut store = base_store();
        store
            .merge_overlay_value(&json!({"pattern_rules": {"SQL_CONCAT": ["Builder:append"]}}))
            .unwrap();
        store
            .merge_overlay_value(&json!({"pattern_rules": {"SQL_CONCAT": ["Buffer:append"]}}))
            .unwrap();

        let (_, sigs) = store.pattern_rules().next().unwrap();
        assert_eq!(sigs.len(), 2);
    }

    #[test]
    fn test_retain_sinks_filters_by_name() {
        let mut store = base_store();
        store
            .merge_overlay_value(&json!({
                "sink_rules": [{"sink_name": "RCE", "sinks": ["Runtime:exec"]}]
            }))
            .unwrap();

        store.retain_sinks(&["RCE".to_string()]);
        assert_eq!(store.sink_rules().len(), 1);
        assert_eq!(store.sink_rules()[0].sink_name, "RCE");

        // Empty filter keeps everything.
        store.retain_sinks(&[]);
        assert_eq!(store.sink_rules().len(), 1);
    }

    #[test]
    fn test_builtin_augments_appended() {
        let store = base_store().with_builtin_augments();
        assert!(store.template_rules().len() > 1);
        assert!(
            store
                .template_rules()
                .iter()
                .any(|r| r.name == "FORM_NO_CSRF")
        );
    }
}

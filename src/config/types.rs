//! Configuration Schema

use serde::{Deserialize, Serialize};

use crate::types::{JavelinError, Result};

/// Persistent scan defaults; CLI arguments override every field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub scan: ScanSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Default rule bundle path
    pub rules: Option<String>,
    /// Overlay bundles merged after the primary bundle
    pub overlays: Vec<String>,
    /// Append the built-in template augments
    pub builtin_rules: bool,
    /// Lite mode: no enrichment, tighter caps
    pub lite: bool,
    pub depth: Option<usize>,
    /// Extra glob patterns excluded from walks
    pub exclude: Vec<String>,
    pub apply_must_substrings: bool,
    pub ignore_skip_dirs: bool,
    pub disable_template_scan: bool,
    /// Restrict template-rule extensions when non-empty
    pub include_exts: Vec<String>,
    /// Restrict sink rules to these sink names when non-empty
    pub sinks: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            scan: ScanSection::default(),
        }
    }
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            rules: None,
            overlays: Vec::new(),
            builtin_rules: true,
            lite: false,
            depth: None,
            exclude: Vec::new(),
            apply_must_substrings: false,
            ignore_skip_dirs: false,
            disable_template_scan: false,
            include_exts: Vec::new(),
            sinks: Vec::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if let Some(depth) = self.scan.depth
            && depth == 0
        {
            return Err(JavelinError::Config(
                "scan.depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.scan.builtin_rules);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut config = Config::default();
        config.scan.depth = Some(0);
        assert!(config.validate().is_err());
    }
}

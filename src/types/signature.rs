//! Method Signatures
//!
//! The canonical identifier of a call-graph node: a `Class:method` pair.
//! Class comparisons elsewhere use short-name equivalence (the last dotted
//! segment); the signature itself stores whatever the parser resolved.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `Class:method` call-graph node identifier
///
/// Equality and hashing are textual; short-name equivalence is a rule-matcher
/// concern, not part of `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Build a signature from its class and method parts
    pub fn new(class_name: impl AsRef<str>, method: impl AsRef<str>) -> Self {
        Self(format!("{}:{}", class_name.as_ref(), method.as_ref()))
    }

    /// Parse a `Class:method` string; both halves must be non-empty after
    /// trimming
    pub fn parse(s: &str) -> Option<Self> {
        let (class_name, method) = s.split_once(':')?;
        let class_name = class_name.trim();
        let method = method.trim();
        if class_name.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self::new(class_name, method))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// The class half, as stored (may be fully qualified)
    pub fn class_name(&self) -> &str {
        self.0.split_once(':').map(|(c, _)| c).unwrap_or(&self.0)
    }

    /// The method half
    pub fn method(&self) -> &str {
        self.0.split_once(':').map(|(_, m)| m).unwrap_or("")
    }

    /// Last dotted segment of the class half
    pub fn short_class(&self) -> &str {
        self.class_name().rsplit('.').next().unwrap_or_default()
    }

    /// The same signature with the class collapsed to its short name
    pub fn shortened(&self) -> Signature {
        Signature::new(self.short_class(), self.method())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.0
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

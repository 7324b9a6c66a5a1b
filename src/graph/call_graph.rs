//! Call Graph
//!
//! Forward edges `caller → callees` recorded during the build phase, with the
//! per-caller callee order preserved and duplicates allowed. The reverse
//! graph is derived once after all files are parsed and is deduplicated; it
//! must equal the transpose of the forward graph whenever the chain finder
//! observes it.

use std::collections::HashMap;

use crate::types::Signature;

/// Forward and derived reverse call edges between `Class:method` nodes
#[derive(Debug, Default)]
pub struct CallGraph {
    forward: HashMap<Signature, Vec<Signature>>,
    reverse: HashMap<Signature, Vec<Signature>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one invocation edge, preserving per-caller insertion order
    pub fn add_edge(&mut self, caller: Signature, callee: Signature) {
        self.forward.entry(caller).or_default().push(callee);
    }

    /// Most recently recorded callee of a caller, used by the fluent-chain
    /// fallback during extraction
    pub fn last_callee_of(&self, caller: &Signature) -> Option<&Signature> {
        self.forward.get(caller).and_then(|callees| callees.last())
    }

    pub fn callees_of(&self, caller: &Signature) -> &[Signature] {
        self.forward
            .get(caller)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Derive the reverse graph by inverting all edges and deduplicating per
    /// callee; call once after the build phase completes
    pub fn build_reverse(&mut self) {
        self.reverse.clear();
        for (caller, callees) in &self.forward {
            for callee in callees {
                let callers = self.reverse.entry(callee.clone()).or_default();
                if !callers.contains(caller) {
                    callers.push(caller.clone());
                }
            }
        }
    }

    pub fn callers_of(&self, callee: &Signature) -> &[Signature] {
        self.reverse
            .get(callee)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn caller_count(&self) -> usize {
        self.forward.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }

    /// Transpose law: every forward edge appears in reverse, and reverse
    /// holds no duplicates
    #[cfg(test)]
    pub fn reverse_is_transpose(&self) -> bool {
        use std::collections::HashSet;

        for (caller, callees) in &self.forward {
            for callee in callees {
                let Some(callers) = self.reverse.get(callee) else {
                    return false;
                };
                if !callers.contains(caller) {
                    return false;
                }
            }
        }
        self.reverse.values().all(|callers| {
            let unique: HashSet<_> = callers.iter().collect();
            unique.len() == callers.len()
        })
    }
}

//! Chain Backtracking
//!
//! Breadth-first search from a sink signature through the reverse call graph
//! until an HTTP entry point is reached. Each queue entry carries its own
//! path and visited set; a global `(caller, depth)` set prunes re-expansion
//! of the same node at the same depth while keeping distinct paths of
//! different length. There is no wall-clock timeout inside the search.

use std::collections::{HashSet, VecDeque};

use crate::constants::graph::{DEPTH_FLOOR, DEPTH_FLOOR_CUTOFF};
use crate::types::Signature;

use super::{CallGraph, ClassIndex};

/// Backtracks sink signatures to entry points over a frozen graph snapshot
pub struct ChainFinder<'a> {
    graph: &'a CallGraph,
    index: &'a ClassIndex,
}

impl<'a> ChainFinder<'a> {
    pub fn new(graph: &'a CallGraph, index: &'a ClassIndex) -> Self {
        Self { graph, index }
    }

    /// The depth cap actually applied to a configured depth
    ///
    /// Depths below the cutoff are raised to the floor; depths in
    /// `[cutoff, floor)` are honored as configured.
    pub fn effective_depth(max_depth: usize) -> usize {
        if max_depth < DEPTH_FLOOR_CUTOFF {
            max_depth.max(DEPTH_FLOOR)
        } else {
            max_depth
        }
    }

    /// All complete entry-point → sink chains for one sink
    ///
    /// `should_stop` is polled every iteration; on stop the chains found so
    /// far are returned.
    pub fn trace_back(
        &self,
        sink: &Signature,
        max_depth: usize,
        should_stop: &dyn Fn() -> bool,
    ) -> Vec<Vec<Signature>> {
        let effective_max_depth = Self::effective_depth(max_depth);

        let mut chains = Vec::new();
        let mut visited_states: HashSet<(Signature, usize)> = HashSet::new();
        let mut queue: VecDeque<(Vec<Signature>, usize, HashSet<Signature>)> = VecDeque::new();
        queue.push_back((
            vec![sink.clone()],
            0,
            HashSet::from([sink.clone()]),
        ));

        while let Some((path, depth, path_nodes)) = queue.pop_front() {
            if should_stop() {
                break;
            }
            if depth >= effective_max_depth {
                continue;
            }

            let frontier = &path[0];
            let callers = self.graph.callers_of(frontier);
            if callers.is_empty() {
                continue;
            }

            for caller in callers {
                if path_nodes.contains(caller) {
                    continue;
                }
                let state = (caller.clone(), depth + 1);
                if visited_states.contains(&state) {
                    continue;
                }
                visited_states.insert(state);

                // No-arg methods cannot carry tainted input.
                if !self.index.is_has_parameters(caller) {
                    continue;
                }

                let mut new_path = Vec::with_capacity(path.len() + 1);
                new_path.push(caller.clone());
                new_path.extend(path.iter().cloned());

                if self.index.is_entry_point(caller) {
                    chains.push(new_path);
                } else {
                    let mut new_nodes = path_nodes.clone();
                    new_nodes.insert(caller.clone());
                    queue.push_back((new_path, depth + 1, new_nodes));
                }
            }
        }

        chains
    }
}

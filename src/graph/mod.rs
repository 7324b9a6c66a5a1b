//! Call-Graph Construction and Backtracking
//!
//! The build-phase data structures (class index, forward/reverse call graph)
//! and the breadth-first chain finder that walks them from sinks to HTTP
//! entry points.

pub mod call_graph;
pub mod chains;
pub mod class_index;

pub use call_graph::CallGraph;
pub use chains::ChainFinder;
pub use class_index::{ClassIndex, ClassRecord, MethodInfo};

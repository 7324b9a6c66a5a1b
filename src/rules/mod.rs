//! Rule Bundles
//!
//! Loading, merging and matching of the JSON rule bundle: sink, source,
//! sanitizer, pattern and template categories plus the engine flags that
//! travel with them.

pub mod builtin;
pub mod matcher;
pub mod model;
pub mod store;

pub use matcher::{MatchList, expand_sink_entry};
pub use model::{
    RuleBundle, SanitizerRule, ScanOptions, SinkRule, SourceRule, TemplateRule,
};
pub use store::RuleStore;

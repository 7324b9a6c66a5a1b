//! Scan Orchestrator
//!
//! Drives the two phases: `build` parses every Java file into the class
//! index and call graph (parallel above a small file-count threshold, one
//! coarse lock around the shared state), then `find` backtracks each
//! configured sink to HTTP entry points and runs the template scanner.
//! Partial results are published through the progress channel at heartbeats
//! and are always delivered before an error surfaces.

pub mod control;

pub use control::{Progress, ProgressCallback, ScanControl};

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzer::parser::{JavaParser, build_call_graph, extract_class_info};
use crate::analyzer::scanner::FileWalker;
use crate::constants::engine as engine_consts;
use crate::constants::graph::DEFAULT_DEPTH;
use crate::graph::{CallGraph, ChainFinder, ClassIndex};
use crate::rules::{RuleStore, SinkRule, expand_sink_entry};
use crate::scoring::{ChainEvidence, ChainScorer};
use crate::template::{TemplateScanStats, TemplateScanner};
use crate::types::{Finding, JavelinError, Result, Signature, sort_for_report};

/// Shared build-phase state behind the single coarse lock
#[derive(Default)]
struct BuildState {
    index: ClassIndex,
    graph: CallGraph,
}

/// Counters reported after the build phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub total_files: usize,
    pub parsed_files: usize,
    pub classes: usize,
    pub call_edges: usize,
    /// Parse throughput in files per minute
    pub rate_per_min: f64,
}

/// Everything a run produces, shaped for serialization
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub build: BuildStats,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_scan: Option<TemplateScanStats>,
}

/// The analysis engine: owns the rules, caches, graphs and control handles
pub struct Engine {
    project_root: PathBuf,
    rules: RuleStore,
    parser: JavaParser,
    state: Mutex<BuildState>,
    control: ScanControl,
    progress: Progress,
    parsed_files: AtomicUsize,
    template_stats: Mutex<Option<TemplateScanStats>>,
}

impl Engine {
    /// Validate the project path and assemble an engine
    pub fn new(project_root: impl AsRef<Path>, rules: RuleStore) -> Result<Self> {
        let project_root = project_root.as_ref().to_path_buf();
        if !project_root.exists() {
            return Err(JavelinError::validation(format!(
                "project path does not exist: {}",
                project_root.display()
            )));
        }
        if !project_root.is_dir() {
            return Err(JavelinError::validation(format!(
                "project path is not a directory: {}",
                project_root.display()
            )));
        }

        Ok(Self {
            project_root,
            rules,
            parser: JavaParser::new(),
            state: Mutex::new(BuildState::default()),
            control: ScanControl::new(),
            progress: Progress::new(None),
            parsed_files: AtomicUsize::new(0),
            template_stats: Mutex::new(None),
        })
    }

    /// Install the progress callback invoked at heartbeats
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Progress::new(Some(callback));
        self
    }

    /// Share an externally owned stop/pause signal
    pub fn with_control(mut self, control: ScanControl) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> ScanControl {
        self.control.clone()
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleStore {
        &mut self.rules
    }

    /// Snapshot of the append-only partial results
    pub fn partial_results(&self) -> Vec<Finding> {
        self.progress.snapshot()
    }

    pub fn template_stats(&self) -> Option<TemplateScanStats> {
        self.template_stats.lock().ok().and_then(|s| s.clone())
    }

    fn walker(&self) -> FileWalker {
        let opts = self.rules.options();
        FileWalker::new(&self.project_root)
            .ignore_skip_dirs(opts.ignore_skip_dirs)
            .with_exclude(&opts.exclude_globs)
    }

    // =========================================================================
    // Build phase
    // =========================================================================

    /// Parse every admitted Java file into the class index and call graph
    pub fn build(&self) -> BuildStats {
        let started = Instant::now();
        self.parsed_files.store(0, Ordering::SeqCst);

        let java_files = if self.control.checkpoint() {
            Vec::new()
        } else {
            self.walker().java_files()
        };
        info!(files = java_files.len(), "building AST and call graph");

        if java_files.len() > engine_consts::PARALLEL_PARSE_THRESHOLD {
            let workers = engine_consts::MAX_WORKERS.min(
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1),
            );
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| {
                    java_files.par_iter().for_each(|path| self.process_file(path));
                }),
                Err(e) => {
                    warn!(error = %e, "worker pool unavailable, parsing sequentially");
                    self.process_sequentially(&java_files);
                }
            }
        } else {
            self.process_sequentially(&java_files);
        }

        // The reverse graph is derived once, single-threaded, after all
        // parsing completes.
        if let Ok(mut state) = self.state.lock() {
            state.graph.build_reverse();
        }
        self.progress.flush();

        let parsed = self.parsed_files.load(Ordering::SeqCst);
        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            ((parsed as f64 / elapsed) * 60.0 * 100.0).round() / 100.0
        } else {
            0.0
        };
        let (classes, call_edges) = self
            .state
            .lock()
            .map(|s| (s.index.len(), s.graph.edge_count()))
            .unwrap_or((0, 0));

        BuildStats {
            total_files: java_files.len(),
            parsed_files: parsed,
            classes,
            call_edges,
            rate_per_min: rate,
        }
    }

    fn process_sequentially(&self, files: &[PathBuf]) {
        for path in files {
            if self.control.checkpoint() {
                break;
            }
            self.process_file(path);
        }
    }

    /// Parse one file and fold it into the shared state under the lock
    fn process_file(&self, path: &Path) {
        if self.control.checkpoint() {
            return;
        }
        let Some(ast) = self.parser.parse_file(path) else {
            return;
        };

        if let Ok(mut state) = self.state.lock() {
            extract_class_info(&ast, path, &mut state.index);
            build_call_graph(&ast, &mut state.graph);
        }

        let parsed = self.parsed_files.fetch_add(1, Ordering::SeqCst) + 1;
        if parsed % engine_consts::HEARTBEAT_EVERY_FILES == 0 {
            self.progress.flush();
        }
    }

    // =========================================================================
    // Find phase
    // =========================================================================

    /// Backtrack every configured sink, then run the template scanner
    ///
    /// Per-rule, per-sink and per-chain failures are isolated; whatever was
    /// found is always published to the progress channel.
    pub fn find(&self) -> Vec<Finding> {
        let mut results = Vec::new();

        let depth = self.rules.options().depth.unwrap_or(DEFAULT_DEPTH);
        let lite = self.rules.options().lite_fast;

        {
            let Ok(state) = self.state.lock() else {
                warn!("build state unavailable, skipping call-graph pass");
                return results;
            };
            let finder = ChainFinder::new(&state.graph, &state.index);
            let scorer = ChainScorer::new(&self.rules, &state.index, &state.graph, &self.parser);

            'sinks: for rule in self.rules.sink_rules() {
                if self.control.should_stop() {
                    break;
                }
                for sink_entry in &rule.sinks {
                    for sink in expand_sink_entry(sink_entry) {
                        if self.control.should_stop() {
                            break 'sinks;
                        }
                        let chains =
                            finder.trace_back(&sink, depth, &|| self.control.should_stop());
                        if chains.is_empty() {
                            continue;
                        }
                        let finding = if lite {
                            lite_finding(rule, &sink, &chains)
                        } else {
                            enriched_finding(rule, &sink, &chains, &scorer)
                        };
                        results.push(finding.clone());
                        self.progress.push(finding);
                        self.progress.flush();
                    }
                }
            }
        }

        if !self.rules.options().disable_template_scan {
            let scanner = TemplateScanner::new(&self.project_root, &self.rules);
            let files = self.walker().template_files(&scanner.rule_extensions());
            let (template_findings, stats) =
                scanner.scan(&files, &self.control, &self.progress);
            debug!(
                files = stats.scanned_files,
                findings = stats.findings,
                "template scan finished"
            );
            if let Ok(mut slot) = self.template_stats.lock() {
                *slot = Some(stats);
            }
            results.extend(template_findings);
        }

        self.progress.flush();
        results
    }

    /// Build, find, and assemble the report
    pub fn run(&self) -> Result<ScanReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let build = self.build();
        let mut findings = self.find();
        sort_for_report(&mut findings);

        Ok(ScanReport {
            started_at,
            finished_at: Utc::now(),
            duration_ms: timer.elapsed().as_millis() as u64,
            build,
            findings,
            template_scan: self.template_stats(),
        })
    }
}

/// Lite-mode finding: chains only, no enrichment
fn lite_finding(rule: &SinkRule, sink: &Signature, chains: &[Vec<Signature>]) -> Finding {
    Finding {
        vul_type: rule.sink_name.clone(),
        sink_desc: rule.sink_desc.clone(),
        severity: rule.severity_level,
        sink: sink.as_str().to_string(),
        call_chains: chains_to_strings(chains),
        chain_count: chains.len(),
        confidence: None,
        sanitized_by: None,
        sources: None,
        patterns: None,
        file_path: None,
        file_path_abs: None,
        group_lines: None,
        scan_mode: None,
    }
}

/// Full finding: per-chain enrichment with the neutral fallback on failure
fn enriched_finding(
    rule: &SinkRule,
    sink: &Signature,
    chains: &[Vec<Signature>],
    scorer: &ChainScorer<'_>,
) -> Finding {
    let enriched: Vec<ChainEvidence> = chains
        .iter()
        .map(|chain| {
            std::panic::catch_unwind(AssertUnwindSafe(|| {
                scorer.enrich(chain, &rule.sink_name)
            }))
            .unwrap_or_else(|_| {
                debug!(sink = %sink, "chain enrichment failed, using fallback");
                ChainEvidence::fallback()
            })
        })
        .collect();

    let confidence = enriched
        .iter()
        .map(|e| e.confidence)
        .fold(0.0f64, f64::max);

    Finding {
        vul_type: rule.sink_name.clone(),
        sink_desc: rule.sink_desc.clone(),
        severity: rule.severity_level,
        sink: sink.as_str().to_string(),
        call_chains: chains_to_strings(chains),
        chain_count: chains.len(),
        confidence: Some(confidence),
        sanitized_by: Some(union_of(enriched.iter().map(|e| e.sanitized_by.as_slice()))),
        sources: Some(union_of(enriched.iter().map(|e| e.sources.as_slice()))),
        patterns: Some(union_of(enriched.iter().map(|e| e.patterns.as_slice()))),
        file_path: None,
        file_path_abs: None,
        group_lines: None,
        scan_mode: None,
    }
}

fn chains_to_strings(chains: &[Vec<Signature>]) -> Vec<Vec<String>> {
    chains
        .iter()
        .map(|chain| chain.iter().map(|sig| sig.as_str().to_string()).collect())
        .collect()
}

/// Order-preserving union of evidence name lists
fn union_of<'a>(lists: impl Iterator<Item = &'a [String]>) -> Vec<String> {
    let mut union: Vec<String> = Vec::new();
    for list in lists {
        for name in list {
            if !union.contains(name) {
                union.push(name.clone());
            }
        }
    }
    union
}

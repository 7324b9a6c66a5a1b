use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use javelin::cli::{OutputFormat, print_report};
use javelin::config::ConfigLoader;
use javelin::{Engine, RuleStore, ScanControl};

#[derive(Parser)]
#[command(name = "javelin")]
#[command(
    version,
    about = "Static taint-analysis and pattern-matching engine for Java web projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[arg(long, short, global = true, help = "Only log warnings and errors")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a Java project for potential vulnerabilities
    Scan {
        #[arg(long, short, help = "Project directory to scan")]
        project: PathBuf,

        #[arg(long, short, help = "Primary rule bundle (JSON)")]
        rules: Option<PathBuf>,

        #[arg(long, help = "Overlay rule bundles merged after the primary one")]
        overlay: Vec<PathBuf>,

        #[arg(long, help = "Skip the built-in template augments")]
        no_builtin_rules: bool,

        #[arg(long, help = "Lite mode: skip enrichment, tighter caps")]
        lite: bool,

        #[arg(long, help = "Call-chain backtracking depth")]
        depth: Option<usize>,

        #[arg(long, help = "Disable the template/regex pass")]
        no_template_scan: bool,

        #[arg(long, help = "Honor per-rule must/exclude substring gates")]
        apply_must_substrings: bool,

        #[arg(long, help = "Walk build/dependency directories too")]
        ignore_skip_dirs: bool,

        #[arg(long, help = "Glob pattern excluded from the walk (repeatable)")]
        exclude: Vec<String>,

        #[arg(long, help = "Only run sink rules with this sink name (repeatable)")]
        sink: Vec<String>,

        #[arg(long, default_value = "text", help = "Output format: text or json")]
        format: OutputFormat,
    },
    /// Show configuration paths and the effective configuration
    Config {
        #[arg(long, help = "Print the effective configuration as JSON")]
        show: bool,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "javelin=debug"
    } else if quiet {
        "javelin=warn"
    } else {
        "javelin=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Scan {
            project,
            rules,
            overlay,
            no_builtin_rules,
            lite,
            depth,
            no_template_scan,
            apply_must_substrings,
            ignore_skip_dirs,
            exclude,
            sink,
            format,
        } => {
            let config = ConfigLoader::load()?;

            let rules_path = rules
                .or_else(|| config.scan.rules.as_ref().map(PathBuf::from))
                .ok_or_else(|| {
                    anyhow::anyhow!("no rule bundle: pass --rules or set scan.rules in the config")
                })?;

            let mut store = RuleStore::load(&rules_path)?;
            for path in overlay
                .iter()
                .map(PathBuf::as_path)
                .chain(config.scan.overlays.iter().map(std::path::Path::new))
            {
                store.merge_overlay_file(path)?;
            }
            if config.scan.builtin_rules && !no_builtin_rules {
                store = store.with_builtin_augments();
            }

            let sink_filter: Vec<String> = if sink.is_empty() {
                config.scan.sinks.clone()
            } else {
                sink
            };
            store.retain_sinks(&sink_filter);

            {
                let opts = store.options_mut();
                opts.lite_fast = lite || config.scan.lite;
                opts.disable_template_scan =
                    no_template_scan || config.scan.disable_template_scan;
                opts.apply_must_substrings =
                    apply_must_substrings || config.scan.apply_must_substrings;
                opts.ignore_skip_dirs = ignore_skip_dirs || config.scan.ignore_skip_dirs;
                opts.include_exts = config.scan.include_exts.clone();
                opts.exclude_globs = if exclude.is_empty() {
                    config.scan.exclude.clone()
                } else {
                    exclude
                };
                if let Some(depth) = depth.or(config.scan.depth) {
                    opts.depth = Some(depth);
                }
            }

            let engine = Engine::new(&project, store)?.with_control(ScanControl::new());
            let report = engine.run()?;
            print_report(&report, format)?;
            Ok(())
        }
        Commands::Config { show } => {
            ConfigLoader::show_paths();
            if show {
                let config = ConfigLoader::load()?;
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

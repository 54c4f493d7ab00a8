//! tlcrun - TLC model-check runner
//!
//! ## Commands
//!
//! - `check`: run TLC on a spec, classify the result, persist a run directory
//!   and print the summary as JSON
//! - `trace`: render a counterexample from a summary or raw trace dump

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

use tlcrun_core::domain::config::{DEFAULT_JAVA, ENGINE_ENV_VAR};
use tlcrun_core::{
    render_step_list, resolve_engine, summarize_trace_dump, Counterexample, MarkerTable,
    ProcessInvoker, RunConfig, RunManager, Summary, WorkbenchError,
};

/// Exit status for failures before the engine produced a verdict.
const SETUP_ERROR_EXIT: u8 = 2;

/// Exit status for failures of the runner itself.
const INTERNAL_ERROR_EXIT: u8 = 1;

#[derive(Parser)]
#[command(name = "tlcrun")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run the TLC model checker and summarize counterexamples", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Model-check a spec and persist the run
    Check(CheckArgs),

    /// Render a counterexample as a step list
    Trace {
        /// A run's summary.json or a raw counterexample.json dump
        #[arg(long)]
        trace: PathBuf,

        /// Stop after this many transitions
        #[arg(long)]
        max_steps: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = TraceFormat::Text)]
        format: TraceFormat,
    },
}

#[derive(clap::Args)]
struct CheckArgs {
    /// TLA+ specification (.tla)
    spec: PathBuf,

    /// Model configuration (default: spec path with .cfg extension)
    #[arg(long)]
    cfg: Option<PathBuf>,

    /// tla2tools.jar, or an executable taking TLC arguments [env: TLA2TOOLS_JAR]
    #[arg(long)]
    jar: Option<PathBuf>,

    /// Java runtime used for .jar engines
    #[arg(long, env = "TLCRUN_JAVA", default_value = DEFAULT_JAVA)]
    java: String,

    /// TLC worker threads
    #[arg(long, default_value = "1")]
    workers: u32,

    /// JVM heap limit in megabytes
    #[arg(long)]
    memory_mb: Option<u64>,

    /// Wall-clock limit in seconds (0 = none)
    #[arg(long, default_value = "0")]
    timeout_secs: u64,

    /// Root directory for run directories (default: <spec-dir>/.tlaplus-workbench/runs)
    #[arg(long, env = "TLCRUN_OUT_ROOT")]
    out_root: Option<PathBuf>,

    /// Marker table override (TOML)
    #[arg(long)]
    markers: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TraceFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tlcrun_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Check(args) => cmd_check(&args).await,
        Commands::Trace {
            trace,
            max_steps,
            format,
        } => cmd_trace(&trace, max_steps, format).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(error_exit_status(&e))
        }
    }
}

fn error_exit_status(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<WorkbenchError>() {
        Some(err) if err.is_setup() => SETUP_ERROR_EXIT,
        _ => INTERNAL_ERROR_EXIT,
    }
}

/// Build the run configuration from parsed arguments and the engine
/// environment variable.
fn build_config(args: &CheckArgs, env_engine: Option<&str>) -> Result<RunConfig> {
    let engine = resolve_engine(args.jar.as_deref(), env_engine)
        .context("Failed to locate the TLC engine")?;
    Ok(RunConfig::new(&args.spec, args.cfg.clone(), engine)
        .with_java(args.java.clone())
        .with_workers(args.workers)
        .with_memory_mb(args.memory_mb)
        .with_timeout_secs(args.timeout_secs)
        .with_out_root(args.out_root.clone()))
}

fn load_markers(path: Option<&Path>) -> Result<MarkerTable> {
    match path {
        Some(path) => MarkerTable::load(path)
            .with_context(|| format!("Failed to load marker table: {:?}", path)),
        None => Ok(MarkerTable::tlc_default()),
    }
}

/// Model-check a spec and print the persisted summary
async fn cmd_check(args: &CheckArgs) -> Result<ExitCode> {
    let env_engine = std::env::var(ENGINE_ENV_VAR).ok();
    let config = build_config(args, env_engine.as_deref())?;
    let markers = load_markers(args.markers.as_deref())?;

    let manager = RunManager::with_invoker(
        Arc::new(ProcessInvoker::new().forwarding_interrupts()),
        markers,
    );
    let summary = manager
        .run(&config)
        .await
        .with_context(|| format!("Model check of {:?} failed", config.spec_path))?;

    info!(
        run_id = %summary.run_id(),
        run_dir = %summary.run.artifacts.run_dir.display(),
        "{}",
        summary.outcome()
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(ExitCode::from(summary.outcome().exit_status()))
}

/// Render a counterexample from a summary or a raw dump
fn cmd_trace(path: &Path, max_steps: Option<usize>, format: TraceFormat) -> Result<()> {
    let ce = load_counterexample(path)?;

    match format {
        TraceFormat::Json => println!("{}", serde_json::to_string_pretty(&ce)?),
        TraceFormat::Text => print!("{}", render_step_list(&ce, max_steps)),
    }
    Ok(())
}

/// Accept either a persisted `summary.json` or a raw engine trace dump.
fn load_counterexample(path: &Path) -> Result<Counterexample> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read trace file: {:?}", path))?;

    if let Ok(summary) = serde_json::from_slice::<Summary>(&bytes) {
        return match summary.trace {
            Some(ce) => Ok(ce),
            None => match summary.trace_error {
                Some(reason) => bail!("run {} has no usable trace: {}", summary.run.run_id, reason),
                None => bail!("run {} produced no counterexample", summary.run.run_id),
            },
        };
    }

    summarize_trace_dump(&bytes).with_context(|| format!("Invalid trace in {:?}", path))
}

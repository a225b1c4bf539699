//! Averloc CLI - batch source transformation

mod config;

use anyhow::{Context, Result, bail};
#[cfg(feature = "parallel")]
use averloc_core::ParallelExecutor;
use averloc_core::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_WORKERS, ExecutionContext,
    ExecutionStats, Executor, JavaEngine, OutputWriter, Planner, Sampling, SimpleExecutor,
    SourceUnit, Split, TaskReport, TransformKind, jobs_for_splits, load_split,
};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Output verbosity level.
#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Filter used when `RUST_LOG` is not set.
    fn log_filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }

    fn info(self, msg: &str) {
        if !matches!(self, Verbosity::Quiet) {
            println!("{msg}");
        }
    }

    fn result(self, msg: &str) {
        if !matches!(self, Verbosity::Quiet) {
            println!("{msg}");
        }
    }
}

fn init_tracing(v: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(v.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Accepts any case of "true"; every other value is false.
fn parse_flag(s: &str) -> Result<bool, String> {
    Ok(s.trim().eq_ignore_ascii_case("true"))
}

#[derive(Parser)]
#[command(name = "averloc")]
#[command(about = "Semantics-preserving source transformation at corpus scale")]
#[command(version)]
struct Cli {
    /// Verbose output (show debug info)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file (default: ~/.config/averloc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options that decide the plan of every task.
#[derive(Args, Clone)]
struct PlanArgs {
    /// Sample random transform sequences of this depth (requires --samples)
    #[arg(long, env = "DEPTH_K")]
    depth_k: Option<usize>,
    /// Number of sequences sampled per task (requires --depth-k)
    #[arg(long, env = "SAMPLES")]
    samples: Option<usize>,
    /// Seed for sampled sequences; task n draws from seed + n
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available transforms
    List,

    /// Show the transform plan a run would apply
    Plan {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Transform the corpus
    Run {
        #[command(flatten)]
        plan: PlanArgs,
        /// Only process the test split
        #[arg(
            long,
            env = "AVERLOC_JUST_TEST",
            action = clap::ArgAction::Set,
            value_parser = parse_flag,
            num_args = 0..=1,
            default_value = "false",
            default_missing_value = "true"
        )]
        test_only: bool,
        /// Directory holding <split>.jsonl.gz inputs
        #[arg(long, env = "AVERLOC_INPUT_DIR")]
        input_dir: Option<PathBuf>,
        /// Root of the output tree
        #[arg(long, env = "AVERLOC_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
        /// Number of worker threads
        #[arg(long)]
        workers: Option<usize>,
        /// Units per task
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Run tasks one after another on the calling thread
        #[arg(long)]
        sequential: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate man page
    Manpage,
}

/// Resolved settings of a run.
struct RunOptions {
    planner: Planner,
    splits: Vec<Split>,
    input_dir: PathBuf,
    output_dir: PathBuf,
    workers: usize,
    chunk_size: usize,
    sequential: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config file
    let config = if let Some(ref path) = cli.config {
        Config::load_from_path(Some(path.clone()))
    } else {
        Config::load()
    };

    // Apply config defaults, CLI flags override
    let verbose = cli.verbose || config.defaults.verbose;
    let quiet = cli.quiet || config.defaults.quiet;
    let verbosity = Verbosity::from_flags(verbose, quiet);
    init_tracing(verbosity);

    match cli.command {
        Commands::List => cmd_list(verbosity),
        Commands::Plan { plan } => {
            let planner = build_planner(&plan, config.defaults.seed)?;
            cmd_plan(&planner, verbosity)
        }
        Commands::Run {
            plan,
            test_only,
            input_dir,
            output_dir,
            workers,
            chunk_size,
            sequential,
        } => {
            let workers = workers.or(config.defaults.workers).unwrap_or(DEFAULT_WORKERS);
            if workers == 0 {
                bail!("--workers must be at least 1");
            }
            let chunk_size = chunk_size
                .or(config.defaults.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE);
            if chunk_size == 0 {
                bail!("--chunk-size must be at least 1");
            }

            let opts = RunOptions {
                planner: build_planner(&plan, config.defaults.seed)?,
                splits: if test_only {
                    vec![Split::Test]
                } else {
                    Split::ALL.to_vec()
                },
                input_dir: input_dir
                    .or(config.defaults.input_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
                output_dir: output_dir
                    .or(config.defaults.output_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
                workers,
                chunk_size,
                sequential,
            };
            cmd_run(opts, verbosity)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "averloc", &mut std::io::stdout());
            Ok(())
        }
        Commands::Manpage => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            man.render(&mut std::io::stdout())?;
            Ok(())
        }
    }
}

/// Sampling is enabled only when both the depth and the sample count are set.
fn build_planner(args: &PlanArgs, config_seed: Option<u64>) -> Result<Planner> {
    let mut planner = Planner::new();

    match (args.depth_k, args.samples) {
        (Some(depth), Some(samples)) => {
            let sampling = Sampling::new(depth, samples).context("Invalid sampling settings")?;
            planner = planner.sampling(sampling);
        }
        (None, None) => {}
        (Some(_), None) => bail!("--depth-k (DEPTH_K) requires --samples (SAMPLES)"),
        (None, Some(_)) => bail!("--samples (SAMPLES) requires --depth-k (DEPTH_K)"),
    }

    if let Some(seed) = args.seed.or(config_seed) {
        planner = planner.seed(seed);
    }
    Ok(planner)
}

fn cmd_list(v: Verbosity) -> Result<()> {
    v.info("Available transforms:\n");

    for kind in TransformKind::ALL {
        v.info(&format!("  {}", kind.output_name()));
        v.info(&format!("    {}", kind.description()));
        v.info("");
    }

    v.info(&format!("Total: {} transforms", TransformKind::ALL.len()));
    Ok(())
}

fn cmd_plan(planner: &Planner, v: Verbosity) -> Result<()> {
    let plan = planner.plan_for(0);

    v.info(&format!("Plan ({} entries):\n", plan.len()));
    for (i, entry) in plan.entries().iter().enumerate() {
        v.result(&format!("  {}. {}", i + 1, entry));
    }

    if let Some(sampling) = planner.sampling_config() {
        v.info(&format!(
            "\nEach task draws its own {} sequences of depth {}.",
            sampling.samples(),
            sampling.depth()
        ));
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn executor(sequential: bool) -> Box<dyn Executor> {
    if sequential {
        Box::new(SimpleExecutor::new())
    } else {
        Box::new(ParallelExecutor::new())
    }
}

#[cfg(not(feature = "parallel"))]
fn executor(_sequential: bool) -> Box<dyn Executor> {
    Box::new(SimpleExecutor::new())
}

fn load_splits(input_dir: &Path, splits: &[Split]) -> Vec<(Split, Vec<SourceUnit>)> {
    splits
        .iter()
        .filter_map(|&split| match load_split(input_dir, split) {
            Ok(units) => Some((split, units)),
            Err(e) => {
                tracing::error!("Skipping {split}: {e}");
                None
            }
        })
        .collect()
}

fn cmd_run(opts: RunOptions, v: Verbosity) -> Result<()> {
    // A split that fails to load contributes no tasks; the run still completes.
    let loaded = load_splits(&opts.input_dir, &opts.splits);
    if loaded.is_empty() {
        tracing::warn!("No splits loaded from {}", opts.input_dir.display());
    }

    let jobs = jobs_for_splits(loaded, opts.chunk_size);
    tracing::info!("Scheduling {} tasks on {} workers", jobs.len(), opts.workers);

    // Writes retry directory creation per file and count their own failures.
    if let Err(e) = std::fs::create_dir_all(&opts.output_dir) {
        tracing::error!(
            "Failed to create output directory {}: {e}",
            opts.output_dir.display()
        );
    }

    let ctx = ExecutionContext::new(
        Arc::new(JavaEngine),
        Arc::new(OutputWriter::new(opts.output_dir.clone())),
    )
    .with_planner(opts.planner)
    .with_parallelism(opts.workers);

    // Progress bar over tasks
    let pb = if !matches!(v, Verbosity::Quiet) {
        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("=> "),
        );
        Some(pb)
    } else {
        None
    };

    let on_done = |report: &TaskReport| {
        if let Some(ref pb) = pb {
            pb.set_message(format!("{} chunk {}", report.split, report.chunk));
            pb.inc(1);
        }
    };

    let result = executor(opts.sequential).execute_batch(&ctx, jobs, &on_done);

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    print_summary(&result.stats, &opts.output_dir, v);
    Ok(())
}

fn print_summary(stats: &ExecutionStats, output_dir: &Path, v: Verbosity) {
    v.result(&format!(
        "Processed {} units in {} tasks ({:.1?})",
        stats.units, stats.tasks, stats.duration
    ));
    v.result(&format!(
        "Wrote {} files to {}",
        stats.files_written,
        output_dir.display()
    ));
    if stats.failed_units > 0 {
        v.result(&format!("Units failed: {}", stats.failed_units));
    }
    if stats.write_failures > 0 {
        v.result(&format!("Write failures: {}", stats.write_failures));
    }
    if stats.degraded_tasks > 0 {
        v.result(&format!("Tasks that crashed: {}", stats.degraded_tasks));
    }
}

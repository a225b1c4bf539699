//! Executor: how batch tasks are scheduled.
//!
//! The executor separates WHAT each task does ([`BatchTask`]) from HOW the
//! tasks run. Every job is one chunk of one split; all jobs are submitted up
//! front and the call blocks until each has produced a [`TaskReport`].

use crate::engine::Engine;
use crate::planner::Planner;
use crate::source::{SourceUnit, Split, chunked};
use crate::task::{BatchTask, TaskReport};
use crate::writer::OutputWriter;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 64;

/// Shared state for running tasks.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Builds models from units.
    pub engine: Arc<dyn Engine>,
    /// Persists transformed classes.
    pub writer: Arc<OutputWriter>,
    /// Supplies each task's plan.
    pub planner: Planner,
    /// Optional parallelism limit (worker count).
    pub parallelism: Option<usize>,
}

impl ExecutionContext {
    /// Create a context with the default planner.
    pub fn new(engine: Arc<dyn Engine>, writer: Arc<OutputWriter>) -> Self {
        Self {
            engine,
            writer,
            planner: Planner::new(),
            parallelism: None,
        }
    }

    pub fn with_planner(mut self, planner: Planner) -> Self {
        self.planner = planner;
        self
    }

    /// Set parallelism limit.
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = Some(workers);
        self
    }
}

/// One chunk of one split, ready to be dispatched.
#[derive(Debug, Clone)]
pub struct Job {
    /// Position among all jobs of a run; seeds the task's plan.
    pub index: usize,
    pub split: Split,
    /// Position of the chunk within its split.
    pub chunk: usize,
    pub units: Vec<SourceUnit>,
}

/// Chunk every loaded split into jobs, in split order.
pub fn jobs_for_splits(loaded: Vec<(Split, Vec<SourceUnit>)>, chunk_size: usize) -> Vec<Job> {
    let mut jobs = Vec::new();
    for (split, units) in loaded {
        for (chunk, units) in chunked(units, chunk_size).into_iter().enumerate() {
            jobs.push(Job {
                index: jobs.len(),
                split,
                chunk,
                units,
            });
        }
    }
    jobs
}

/// Aggregate of all task reports of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Total execution duration.
    pub duration: Duration,
    pub tasks: usize,
    /// Tasks that panicked.
    pub degraded_tasks: usize,
    pub units: usize,
    /// Units that failed at least one plan entry.
    pub failed_units: usize,
    pub files_written: usize,
    pub write_failures: usize,
}

impl ExecutionStats {
    fn record(&mut self, report: &TaskReport) {
        self.tasks += 1;
        self.units += report.units;
        self.failed_units += report.failures.len();
        self.files_written += report.emitted.written;
        self.write_failures += report.emitted.failed;
        if report.is_degraded() {
            self.degraded_tasks += 1;
        }
    }
}

/// Reports of every job, in submission order.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub reports: Vec<TaskReport>,
    pub stats: ExecutionStats,
}

impl ExecutionResult {
    fn new(reports: Vec<TaskReport>, duration: Duration) -> Self {
        let mut stats = ExecutionStats {
            duration,
            ..Default::default()
        };
        for report in &reports {
            stats.record(report);
        }
        Self { reports, stats }
    }
}

/// Executor determines HOW a batch of jobs runs.
///
/// - `SimpleExecutor`: sequential, for debugging and small runs
/// - `ParallelExecutor`: fixed-size worker pool (requires `parallel` feature)
pub trait Executor: Send + Sync {
    /// Run every job and block until all have finished.
    ///
    /// `on_done` is called once per finished task, possibly from worker
    /// threads.
    fn execute_batch(
        &self,
        ctx: &ExecutionContext,
        jobs: Vec<Job>,
        on_done: &(dyn Fn(&TaskReport) + Sync),
    ) -> ExecutionResult;
}

/// Run one job. Panics are contained and reported as a degraded task.
pub fn run_job(ctx: &ExecutionContext, job: Job) -> TaskReport {
    let Job {
        index,
        split,
        chunk,
        units,
    } = job;
    let count = units.len();
    let plan = ctx.planner.plan_for(index);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        BatchTask::new(ctx.engine.as_ref(), &ctx.writer, split, chunk, units, plan).run()
    }));

    match outcome {
        Ok(report) => report,
        Err(payload) => {
            tracing::error!(
                "Chunk {chunk} of {split} panicked: {}",
                panic_message(payload.as_ref())
            );
            TaskReport::degraded(split, chunk, count)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Debug level: callers that show progress do so through `on_done`.
fn log_finished(report: &TaskReport, finished: usize, total: usize) {
    tracing::debug!(
        "Tasks finished: {finished}/{total} (chunk {} of {}, {} units, {} failed)",
        report.chunk,
        report.split,
        report.units,
        report.failures.len()
    );
}

/// Sequential executor.
#[derive(Debug, Clone, Default)]
pub struct SimpleExecutor;

impl SimpleExecutor {
    /// Create a new simple executor.
    pub fn new() -> Self {
        Self
    }
}

impl Executor for SimpleExecutor {
    fn execute_batch(
        &self,
        ctx: &ExecutionContext,
        jobs: Vec<Job>,
        on_done: &(dyn Fn(&TaskReport) + Sync),
    ) -> ExecutionResult {
        let start = Instant::now();
        let total = jobs.len();

        let reports = jobs
            .into_iter()
            .enumerate()
            .map(|(i, job)| {
                let report = run_job(ctx, job);
                log_finished(&report, i + 1, total);
                on_done(&report);
                report
            })
            .collect();

        ExecutionResult::new(reports, start.elapsed())
    }
}

// ============================================================================
// Parallel Executor (requires "parallel" feature)
// ============================================================================

/// Parallel executor backed by a rayon thread pool.
///
/// The pool has `ctx.parallelism` workers (default [`DEFAULT_WORKERS`]) and
/// is shut down when the batch completes.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Default)]
pub struct ParallelExecutor;

#[cfg(feature = "parallel")]
impl ParallelExecutor {
    /// Create a new parallel executor.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "parallel")]
impl Executor for ParallelExecutor {
    fn execute_batch(
        &self,
        ctx: &ExecutionContext,
        jobs: Vec<Job>,
        on_done: &(dyn Fn(&TaskReport) + Sync),
    ) -> ExecutionResult {
        use rayon::prelude::*;

        let start = Instant::now();
        let total = jobs.len();
        let finished = AtomicUsize::new(0);

        let workers = ctx.parallelism.unwrap_or(DEFAULT_WORKERS).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("averloc-worker-{i}"))
            .build()
            .ok();

        let execute_job = |job: Job| {
            let report = run_job(ctx, job);
            let n = finished.fetch_add(1, Ordering::Relaxed) + 1;
            log_finished(&report, n, total);
            on_done(&report);
            report
        };

        let reports = if let Some(pool) = pool {
            pool.install(|| jobs.into_par_iter().map(execute_job).collect())
        } else {
            tracing::warn!("Failed to build a pool of {workers} workers, using the global pool");
            jobs.into_par_iter().map(execute_job).collect()
        };

        ExecutionResult::new(reports, start.elapsed())
    }
}

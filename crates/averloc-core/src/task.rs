//! Batch task: applies a whole plan to one chunk with fault isolation.
//!
//! For each plan entry the chunk is first processed as one model. If building
//! or transforming that model fails, every unit is retried on its own, and
//! units that still fail are remembered in the task's [`FailureSet`] so later
//! entries skip them.

use crate::engine::Engine;
use crate::planner::Plan;
use crate::source::{SourceUnit, Split};
use crate::syntax::{Model, ParseError};
use crate::transform::{TransformError, Touched, TransformUnit};
use crate::writer::{EmitStats, OutputWriter};
use indexmap::IndexSet;

/// Ids of units known to fail within one task. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSet(IndexSet<String>);

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Record a failing id. Returns false if it was already known.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Why building or transforming a model failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("build failed: {0}")]
    Parse(#[from] ParseError),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
}

/// What happened to one plan entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    /// Output name of the entry.
    pub name: String,
    /// Whether the whole-chunk attempt succeeded.
    pub batch_succeeded: bool,
    /// Ids transformed successfully, in chunk order.
    pub processed: Vec<String>,
    /// Ids that failed for the first time during this entry.
    pub newly_failed: Vec<String>,
    pub emitted: EmitStats,
}

impl EntryOutcome {
    fn new(name: String) -> Self {
        Self {
            name,
            batch_succeeded: false,
            processed: Vec::new(),
            newly_failed: Vec::new(),
            emitted: EmitStats::default(),
        }
    }
}

/// Result of one task. Replaces any process-wide progress counter.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub split: Split,
    pub chunk: usize,
    /// Number of units in the chunk.
    pub units: usize,
    pub entries: Vec<EntryOutcome>,
    pub failures: FailureSet,
    pub emitted: EmitStats,
    /// The task panicked; its outputs may be incomplete.
    pub panicked: bool,
}

impl TaskReport {
    /// Report for a task that did not run to completion.
    pub fn degraded(split: Split, chunk: usize, units: usize) -> Self {
        Self {
            split,
            chunk,
            units,
            entries: Vec::new(),
            failures: FailureSet::new(),
            emitted: EmitStats::default(),
            panicked: true,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.panicked
    }
}

/// One chunk of units together with the plan to apply to it.
pub struct BatchTask<'a> {
    engine: &'a dyn Engine,
    writer: &'a OutputWriter,
    split: Split,
    chunk: usize,
    units: Vec<SourceUnit>,
    plan: Plan,
}

impl<'a> BatchTask<'a> {
    pub fn new(
        engine: &'a dyn Engine,
        writer: &'a OutputWriter,
        split: Split,
        chunk: usize,
        units: Vec<SourceUnit>,
        plan: Plan,
    ) -> Self {
        Self {
            engine,
            writer,
            split,
            chunk,
            units,
            plan,
        }
    }

    /// Apply every plan entry in order. Never fails; failures end up in the
    /// report.
    pub fn run(&self) -> TaskReport {
        let mut failures = FailureSet::new();
        let mut entries = Vec::with_capacity(self.plan.len());
        let mut emitted = EmitStats::default();

        for transform in self.plan.entries() {
            let outcome = self.run_entry(transform, &mut failures);
            emitted += outcome.emitted;
            entries.push(outcome);
        }

        tracing::debug!(
            "Chunk {} of {} done: {} units, {} failed, {} files",
            self.chunk,
            self.split,
            self.units.len(),
            failures.len(),
            emitted.written
        );

        TaskReport {
            split: self.split,
            chunk: self.chunk,
            units: self.units.len(),
            entries,
            failures,
            emitted,
            panicked: false,
        }
    }

    fn attempt(
        &self,
        units: &[&SourceUnit],
        transform: &TransformUnit,
    ) -> Result<(Model, Touched), AttemptError> {
        let mut model = self.engine.build(units)?;
        let touched = transform.apply(&mut model)?;
        Ok((model, touched))
    }

    fn run_entry(&self, transform: &TransformUnit, failures: &mut FailureSet) -> EntryOutcome {
        let mut outcome = EntryOutcome::new(transform.name());
        let active: Vec<&SourceUnit> = self
            .units
            .iter()
            .filter(|u| !failures.contains(u.id()))
            .collect();

        if active.is_empty() {
            return outcome;
        }

        match self.attempt(&active, transform) {
            Ok((model, touched)) => {
                outcome.emitted = self.writer.emit(&model, &touched, &outcome.name, self.split);
                outcome.processed = active.iter().map(|u| u.id().to_string()).collect();
                outcome.batch_succeeded = true;
                return outcome;
            }
            // A single unit has nothing left to isolate.
            Err(e) if active.len() == 1 => {
                self.record_failure(active[0], &e, failures, &mut outcome);
                return outcome;
            }
            Err(e) => {
                tracing::debug!(
                    "Chunk {} of {}: {} failed as a batch, retrying per file: {e}",
                    self.chunk,
                    self.split,
                    outcome.name
                );
            }
        }

        for unit in active {
            match self.attempt(&[unit], transform) {
                Ok((model, touched)) => {
                    let emitted = self.writer.emit(&model, &touched, &outcome.name, self.split);
                    outcome.emitted += emitted;
                    outcome.processed.push(unit.id().to_string());
                }
                Err(e) => self.record_failure(unit, &e, failures, &mut outcome),
            }
        }

        outcome
    }

    fn record_failure(
        &self,
        unit: &SourceUnit,
        error: &AttemptError,
        failures: &mut FailureSet,
        outcome: &mut EntryOutcome,
    ) {
        tracing::warn!(
            "Failed to transform {} with {}: {error}",
            unit.virtual_name(),
            outcome.name
        );
        if failures.insert(unit.id()) {
            outcome.newly_failed.push(unit.id().to_string());
        }
    }
}

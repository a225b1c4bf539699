//! Averloc: semantics-preserving rewrites of Java source at corpus scale
//!
//! Averloc reads compressed corpora of Java methods, applies a catalog of
//! source transforms (or random sequences of them) to chunks of units, and
//! writes every transformed class to a per-transform output tree. A unit that
//! breaks a whole-chunk attempt is isolated and retried alone, so one bad
//! input never costs the rest of its chunk.

mod engine;
mod executor;
mod loader;
mod planner;
mod source;
pub mod syntax;
mod task;
mod transform;
mod writer;

pub use engine::{Engine, JavaEngine};
#[cfg(feature = "parallel")]
pub use executor::ParallelExecutor;
pub use executor::{
    DEFAULT_WORKERS, ExecutionContext, ExecutionResult, ExecutionStats, Executor, Job,
    SimpleExecutor, jobs_for_splits, run_job,
};
pub use loader::{DEFAULT_INPUT_DIR, LoadError, load_from_reader, load_split, split_path};
pub use planner::{DEFAULT_PASS, Plan, PlanError, Planner, Sampling};
pub use source::{
    DEFAULT_CHUNK_SIZE, SourceUnit, Split, UnknownSplit, WRAPPER, WRAPPER_PREFIX, chunked,
    unit_identifier,
};
pub use syntax::{Model, ParseError, ParseErrorKind};
pub use task::{AttemptError, BatchTask, EntryOutcome, FailureSet, TaskReport};
pub use transform::{
    IDENTITY_NAME, TRANSFORM_PREFIX, Touched, TransformError, TransformKind, TransformUnit,
    placeholder,
};
pub use writer::{DEFAULT_EXTENSION, DEFAULT_OUTPUT_DIR, EmitStats, OutputWriter, WriteError};

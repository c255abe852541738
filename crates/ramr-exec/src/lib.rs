#![forbid(unsafe_code)]
//! ramr-exec: reference execution environment for compiled stage graphs.
//!
//! Runs stages wave by wave (a stage starts only after all of its inputs are
//! stored), does map → group-by-key → reduce inside each stage, retries failed
//! stages a bounded number of times, and emits a `RunManifest`.
//!
//! Stages of one wave run one after another by default; the `async-scheduler`
//! feature runs them on a tokio pool bounded by `max_parallel_tasks`.

pub mod failpoints;
pub mod metrics;
pub mod replay;
pub mod runtime;
pub mod scheduler;

pub use runtime::{Engine, ExecError, RunOutput, StageReport};

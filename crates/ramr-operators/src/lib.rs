#![forbid(unsafe_code)]
//! ramr-operators: per-stage map/reduce callables.
//!
//! Design intent:
//! - Keep this crate pure and synchronous; the exec crate owns scheduling,
//!   shuffling and storage.
//! - `map` and `reduce` are deterministic and side-effect free, so a stage can
//!   be retried from its inputs at any time.
//! - Each compiled stage's `OperatorSpec` is turned into an operator through
//!   `registry::build`.

pub mod eval;
pub mod registry;
pub mod traits;

pub mod join;
pub mod project;
pub mod rename;
pub mod select;

pub use registry::build;
pub use traits::{KeyedRecord, OpError, Operator};

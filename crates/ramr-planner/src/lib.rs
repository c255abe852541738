#![forbid(unsafe_code)]
//! ramr-planner: relational-algebra plan → optimized plan → stage graph.
//!
//! Design:
//! - Plans are `ramr_core::expr::RaExpr` values; every rewrite is a plain
//!   `fn(RaExpr) -> RaExpr` and never mutates a shared node.
//! - This crate adds:
//!     * four heuristic rewrite passes (`rules`), with attribute resolution
//!       against the data dictionary (`resolve`)
//!     * a stage compiler that assigns `StepId`s and dependency edges
//!       (`compile`, `stage`)
//!     * a small YAML plan format (`dsl::yaml`)

pub mod compile;
pub mod dsl;
pub mod resolve;
pub mod rules;
pub mod stage;

pub use compile::{compile, compile_from, count_steps};
pub use dsl::yaml::{parse_yaml_pipeline, ParsedPipeline};
pub use resolve::Resolution;
pub use rules::{break_up_selections, introduce_joins, merge_selections, optimize, push_down_selections};
pub use stage::{OperatorSpec, Stage, StageGraph};

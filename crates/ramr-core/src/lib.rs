#![forbid(unsafe_code)]
//! ramr-core: shared plan model and plumbing types for the ramr workspace.
//!
//! - `expr`: the relational-algebra tree (`RaExpr`) and its conditions.
//! - `dictionary`: relation → attribute → type metadata for name resolution.
//! - `types`: runtime scalars, tuples and provenance-tagged records.
//! - `id`, `config`, `hash`, `manifest`: ids, engine configuration, stable
//!   hashing and the run manifest emitted by the execution layer.
//!
//! No I/O and no async here; every other crate builds on these types.

pub mod config;
pub mod dictionary;
pub mod error;
pub mod expr;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod types;

/// Crate version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Error, Result};

#![forbid(unsafe_code)]
//! ramr-io: where stage inputs and outputs live.
//!
//! - `storage`: byte-level `Storage` trait, `FsStorage`, and the builder that
//!   picks a backend from `EngineConfig`.
//! - `memory_storage`: in-memory backend used for MOCK execution.
//! - `naming`: `R.json` / `tmpN` / `tmpN.tmp` path conventions.
//! - `records`: `RecordStore`, which reads and writes `label\tjson` lines.

pub mod error;
pub mod memory_storage;
pub mod naming;
pub mod records;
pub mod storage;

pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use records::RecordStore;
pub use storage::{build_storage, FsStorage, Storage};

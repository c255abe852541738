//! Byte-level storage for relations and stage outputs.
//!
//! Paths are `/`-separated and relative to the backend's root:
//! - `fs`: a directory on the local filesystem (LOCAL and DISTRIBUTED).
//! - `crate::memory_storage`: a shared in-process map (MOCK).

mod fs;
pub use fs::FsStorage;

use std::sync::Arc;

use ramr_core::config::{EngineConfig, ExecEnv};

use crate::error::{Error, Result};
use crate::memory_storage::MemoryStorage;

/// Abstract storage interface for records at rest.
pub trait Storage: Send + Sync {
    /// Write bytes to a path, replacing any previous content. Creates parent
    /// directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read the whole object at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete a path and everything below it. Idempotent.
    fn delete(&self, path: &str) -> Result<()>;

    /// List object paths under a prefix, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Whether `path` names an object or a directory of objects.
    fn exists(&self, path: &str) -> Result<bool>;
}

/// Build the storage backend for the configured execution environment.
pub fn build_storage(cfg: &EngineConfig) -> Result<Arc<dyn Storage>> {
    match cfg.exec_env {
        ExecEnv::Mock => Ok(Arc::new(MemoryStorage::new())),
        ExecEnv::Local | ExecEnv::Distributed => {
            if cfg.data_dir.trim().is_empty() {
                return Err(Error::Config(format!(
                    "{} execution needs a data directory",
                    cfg.exec_env
                )));
            }
            Ok(Arc::new(FsStorage::new(&cfg.data_dir)))
        }
    }
}

//! In-memory storage backend for MOCK execution and tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Thread-safe in-memory storage. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }

    /// Pre-populate data for a path (used by tests).
    pub fn insert(&self, path: impl Into<String>, bytes: Vec<u8>) -> Result<()> {
        self.lock()?.insert(path.into(), bytes);
        Ok(())
    }

    /// Number of stored objects.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }
}

fn under(key: &str, dir: &str) -> bool {
    key.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.lock()?
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("path not found: {}", path)))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let dir = path.trim_end_matches('/');
        self.lock()?.retain(|k, _| k != dir && !under(k, dir));
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // BTreeMap keys come out sorted.
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let dir = path.trim_end_matches('/');
        Ok(self.lock()?.keys().any(|k| k == dir || under(k, dir)))
    }
}

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Local filesystem storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let p = self.resolve(path);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Storage(format!("mkparent: {e}")))?;
        }
        let mut f = File::create(&p).map_err(|e| Error::Storage(format!("create: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| Error::Storage(format!("write: {e}")))?;
        f.flush()
            .map_err(|e| Error::Storage(format!("flush: {e}")))?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let p = self.resolve(path);
        fs::read(&p).map_err(|e| Error::Storage(format!("read {}: {e}", p.display())))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let p = self.resolve(path);
        if p.is_dir() {
            fs::remove_dir_all(&p).map_err(|e| Error::Storage(format!("delete: {e}")))?;
        } else if p.exists() {
            fs::remove_file(&p).map_err(|e| Error::Storage(format!("delete: {e}")))?;
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let start = self.resolve(prefix);
        let mut results = Vec::new();

        if !start.exists() {
            return Ok(results);
        }

        if start.is_file() {
            results.push(prefix.trim_end_matches('/').to_string());
            return Ok(results);
        }

        fn visit_dirs(dir: &Path, root: &Path, results: &mut Vec<String>) -> std::io::Result<()> {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    visit_dirs(&path, root, results)?;
                } else if let Ok(rel) = path.strip_prefix(root) {
                    let parts: Vec<String> = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    results.push(parts.join("/"));
                }
            }
            Ok(())
        }

        visit_dirs(&start, &self.root, &mut results)
            .map_err(|e| Error::Storage(format!("list: {e}")))?;
        results.sort();
        Ok(results)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ramr-fs-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn write_read_delete() {
        let dir = scratch("rw");
        let storage = FsStorage::new(&dir);
        storage.write("tmp2.tmp", b"hello").unwrap();
        assert_eq!(storage.read("tmp2.tmp").unwrap(), b"hello");
        assert!(storage.exists("tmp2.tmp").unwrap());
        storage.delete("tmp2.tmp").unwrap();
        assert!(!storage.exists("tmp2.tmp").unwrap());
        storage.delete("tmp2.tmp").unwrap();
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn lists_directory_parts_relative_to_root() {
        let dir = scratch("parts");
        let storage = FsStorage::new(&dir);
        storage.write("tmp4/part-00001", b"b").unwrap();
        storage.write("tmp4/part-00000", b"a").unwrap();
        storage.write("tmp5.tmp", b"c").unwrap();
        assert_eq!(
            storage.list("tmp4/").unwrap(),
            vec!["tmp4/part-00000".to_string(), "tmp4/part-00001".to_string()]
        );
        storage.delete("tmp4").unwrap();
        assert!(storage.list("tmp4/").unwrap().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }
}

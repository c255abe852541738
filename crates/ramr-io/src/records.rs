//! Record-level access on top of `Storage`.
//!
//! Every object holds one record per line, `"<label>\t<json tuple>"`. Blank
//! lines are ignored on read.

use std::sync::Arc;

use ramr_core::config::ExecEnv;
use ramr_core::id::StepId;
use ramr_core::types::Record;

use crate::error::{Error, Result};
use crate::naming::{output_path, part_path, relation_path};
use crate::storage::Storage;

pub fn encode_records(records: &[Record]) -> Result<Vec<u8>> {
    let mut out = String::new();
    for rec in records {
        out.push_str(&rec.to_line()?);
        out.push('\n');
    }
    Ok(out.into_bytes())
}

pub fn decode_records(path: &str, bytes: &[u8]) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Codec(format!("{path}: not utf-8: {e}")))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            Record::from_line(line).map_err(|e| Error::Codec(format!("{path}:{}: {e}", i + 1)))
        })
        .collect()
}

/// Reads base relations and reads/writes stage outputs under the naming
/// convention of one execution environment.
#[derive(Clone)]
pub struct RecordStore {
    storage: Arc<dyn Storage>,
    env: ExecEnv,
}

impl RecordStore {
    pub fn new(storage: Arc<dyn Storage>, env: ExecEnv) -> Self {
        Self { storage, env }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn env(&self) -> ExecEnv {
        self.env
    }

    pub fn read_relation(&self, relation: &str) -> Result<Vec<Record>> {
        let path = relation_path(relation);
        decode_records(&path, &self.storage.read(&path)?)
    }

    /// Store a base relation; used to seed MOCK storage.
    pub fn write_relation(&self, relation: &str, records: &[Record]) -> Result<()> {
        self.storage
            .write(&relation_path(relation), &encode_records(records)?)
    }

    /// Write the output of `step`, replacing any earlier attempt. Returns the
    /// path written.
    pub fn write_output(&self, step: StepId, records: &[Record]) -> Result<String> {
        let path = output_path(step, self.env);
        let bytes = encode_records(records)?;
        match self.env {
            ExecEnv::Distributed => {
                self.storage.delete(&path)?;
                self.storage.write(&part_path(&path, 0), &bytes)?;
            }
            ExecEnv::Local | ExecEnv::Mock => self.storage.write(&path, &bytes)?,
        }
        Ok(path)
    }

    pub fn read_output(&self, step: StepId) -> Result<Vec<Record>> {
        let path = output_path(step, self.env);
        match self.env {
            ExecEnv::Distributed => {
                if !self.storage.exists(&path)? {
                    return Err(Error::Storage(format!("no output at {path}")));
                }
                let mut records = Vec::new();
                for part in self.storage.list(&format!("{path}/"))? {
                    records.extend(decode_records(&part, &self.storage.read(&part)?)?);
                }
                Ok(records)
            }
            ExecEnv::Local | ExecEnv::Mock => decode_records(&path, &self.storage.read(&path)?),
        }
    }

    pub fn remove_output(&self, step: StepId) -> Result<()> {
        self.storage.delete(&output_path(step, self.env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_storage::MemoryStorage;
    use ramr_core::types::{tuple_of, Scalar};

    fn amy() -> Record {
        Record::new(
            "Person",
            tuple_of([("Person.name", Scalar::from("Amy")), ("Person.age", Scalar::Int(16))]),
        )
    }

    #[test]
    fn reads_relation_lines() {
        let storage = MemoryStorage::new();
        storage
            .insert(
                "Person.json",
                b"Person\t{\"Person.name\": \"Amy\", \"Person.age\": 16}\n\nPerson\t{\"Person.name\": \"Ben\", \"Person.age\": 21}\n".to_vec(),
            )
            .unwrap();
        let store = RecordStore::new(Arc::new(storage), ExecEnv::Mock);
        let people = store.read_relation("Person").unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0], amy());
    }

    #[test]
    fn bad_line_reports_position() {
        let err = decode_records("Person.json", b"Person\t{}\nbroken\n").unwrap_err();
        assert!(err.to_string().contains("Person.json:2"));
    }

    #[test]
    fn distributed_outputs_are_part_directories() {
        let storage = MemoryStorage::new();
        let store = RecordStore::new(Arc::new(storage.clone()), ExecEnv::Distributed);
        let path = store.write_output(StepId::new(2), &[amy(), amy()]).unwrap();
        assert_eq!(path, "tmp2");
        assert!(storage.exists("tmp2/part-00000").unwrap());
        assert_eq!(store.read_output(StepId::new(2)).unwrap().len(), 2);

        store.remove_output(StepId::new(2)).unwrap();
        assert!(store.read_output(StepId::new(2)).is_err());
    }

    #[test]
    fn local_outputs_are_single_files() {
        let storage = MemoryStorage::new();
        let store = RecordStore::new(Arc::new(storage.clone()), ExecEnv::Mock);
        assert_eq!(store.write_output(StepId::new(5), &[amy()]).unwrap(), "tmp5.tmp");
        assert_eq!(store.read_output(StepId::new(5)).unwrap(), vec![amy()]);
        assert!(storage.exists("tmp5.tmp").unwrap());
    }
}

//! Rename: relabel every attribute key and the record itself.

use ramr_core::types::{Record, Tuple};
use serde::{Deserialize, Serialize};

use crate::traits::{KeyedRecord, OpError, Operator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rename {
    pub alias: String,
}

impl Rename {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }

    fn rekey(&self, key: &str) -> String {
        match key.split_once('.') {
            Some((_, attr)) => format!("{}.{}", self.alias, attr),
            None => format!("{}.{}", self.alias, key),
        }
    }
}

impl Operator for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn map(&self, record: &Record) -> Result<Vec<KeyedRecord>, OpError> {
        let mut tuple = Tuple::new();
        for (key, value) in &record.tuple {
            let new_key = self.rekey(key);
            if tuple.insert(new_key.clone(), value.clone()).is_some() {
                return Err(OpError::Exec(format!(
                    "renaming '{}' to '{}' collides on '{}'",
                    record.label, self.alias, new_key
                )));
            }
        }
        Ok(vec![(String::new(), Record::new(self.alias.clone(), tuple))])
    }
}

//! Project with DISTINCT semantics.
//!
//! Map restricts each tuple to the requested attributes and keys it by the
//! canonical JSON of the result; reduce keeps one record per key.

use ramr_core::expr::AttrRef;
use ramr_core::types::{Record, Tuple};
use serde::{Deserialize, Serialize};

use crate::eval::resolve;
use crate::traits::{KeyedRecord, OpError, Operator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub attributes: Vec<AttrRef>,
}

impl Project {
    pub fn new(attributes: Vec<AttrRef>) -> Self {
        Self { attributes }
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn map(&self, record: &Record) -> Result<Vec<KeyedRecord>, OpError> {
        let mut tuple = Tuple::new();
        for attr in &self.attributes {
            let (key, value) = resolve(attr, record)?;
            tuple.insert(key.clone(), value.clone());
        }
        let out = Record::new(record.label.clone(), tuple);
        let key = out.tuple_json()?;
        Ok(vec![(key, out)])
    }

    fn has_reduce(&self) -> bool {
        true
    }

    fn reduce(&self, _key: &str, values: Vec<Record>) -> Result<Vec<Record>, OpError> {
        Ok(values.into_iter().take(1).collect())
    }
}

//! Select: stateless filter in the map phase.

use ramr_core::expr::Condition;
use ramr_core::types::Record;
use serde::{Deserialize, Serialize};

use crate::eval::eval_condition;
use crate::traits::{KeyedRecord, OpError, Operator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Select {
    pub condition: Condition,
}

impl Select {
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }
}

impl Operator for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn map(&self, record: &Record) -> Result<Vec<KeyedRecord>, OpError> {
        if eval_condition(&self.condition, record)? {
            Ok(vec![(String::new(), record.clone())])
        } else {
            Ok(vec![])
        }
    }
}

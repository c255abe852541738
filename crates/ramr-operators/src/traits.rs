//! Operator trait + common interfaces.
//!
//! The exec runtime calls `map` once per input record, groups the emitted
//! pairs by key, then calls `reduce` once per key when `has_reduce` is true.
//! Operators without a reduce phase have their mapped records written out as
//! they are.

use ramr_core::types::Record;

use thiserror::Error;

/// Shuffle key plus the record routed under it.
pub type KeyedRecord = (String, Record);

#[derive(Debug, Error)]
pub enum OpError {
    #[error("cannot resolve attribute '{attr}' in record labelled '{label}'")]
    AttributeResolution { attr: String, label: String },

    #[error("malformed condition: {0}")]
    Condition(String),

    #[error("execution error: {0}")]
    Exec(String),
}

impl From<ramr_core::Error> for OpError {
    fn from(e: ramr_core::Error) -> Self {
        OpError::Exec(e.to_string())
    }
}

impl From<serde_json::Error> for OpError {
    fn from(e: serde_json::Error) -> Self {
        OpError::Exec(format!("key encoding: {e}"))
    }
}

/// Trait that all stage operators implement.
///
/// Invariants:
/// - `map` must be pure: the same record always yields the same pairs.
/// - `reduce` sees every value emitted for its key, in no particular order.
pub trait Operator: Send + Sync + 'static {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    fn map(&self, record: &Record) -> Result<Vec<KeyedRecord>, OpError>;

    fn has_reduce(&self) -> bool {
        false
    }

    fn reduce(&self, _key: &str, values: Vec<Record>) -> Result<Vec<Record>, OpError> {
        Ok(values)
    }
}

use thiserror::Error;

use crate::expr::OperatorKind;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Planning error: {0}")]
    Plan(String),

    /// Raised by the stage compiler; cross products are never scheduled.
    #[error("Unsupported operator: {0} cannot be compiled into a stage")]
    UnsupportedOperator(OperatorKind),

    #[error("Record codec error: {0}")]
    Codec(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

//! Convenient re-exports for downstream crates.

pub use crate::config::{EngineConfig, ExecEnv};
pub use crate::dictionary::{AttrType, DataDictionary};
pub use crate::error::{Error, Result};
pub use crate::expr::{AttrRef, BinOp, Condition, Literal, OperatorKind, RaExpr};
pub use crate::id::StepId;
pub use crate::manifest::{ManifestId, RunManifest};
pub use crate::types::{Record, Scalar, Tuple};

//! Deterministic replay & provenance helpers.
//!
//! The manifest's plan hash is computed from the serialized stage graph, so
//! two runs of the same optimized plan carry the same hash. The outputs digest
//! ignores record order, which the shuffle does not fix.

use ramr_core::hash::{hash_bytes, hash_serde, Hash256};
use ramr_core::types::Record;
use ramr_planner::stage::StageGraph;

use crate::ExecError;

/// Stable hash of a compiled stage graph.
pub fn hash_graph(graph: &StageGraph) -> Result<Hash256, ExecError> {
    hash_serde(graph).map_err(|e| ExecError::Hash(e.to_string()))
}

/// Order-independent digest of a record set.
pub fn hash_records(records: &[Record]) -> Result<Hash256, ExecError> {
    let mut lines = records
        .iter()
        .map(|r| r.to_line())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ExecError::Hash(e.to_string()))?;
    lines.sort();
    Ok(hash_bytes(lines.join("\n").as_bytes()))
}

//! Run manifest emitted after a compiled plan finishes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the compiled stage graph.
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Stages that ran (scan stages included).
    pub stages_run: usize,

    /// Records produced by the root stage.
    pub output_records: usize,

    /// Order-independent digest of the root stage's records.
    pub outputs_digest: Option<Hash256>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(plan_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            stages_run: 0,
            output_records: 0,
            outputs_digest: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(
        mut self,
        finished_ms: u64,
        stages_run: usize,
        output_records: usize,
        outputs_digest: Option<Hash256>,
    ) -> Self {
        self.finished_ms = finished_ms;
        self.stages_run = stages_run;
        self.output_records = output_records;
        self.outputs_digest = outputs_digest;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}

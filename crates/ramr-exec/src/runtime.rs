//! Runtime: execute a compiled `StageGraph` and emit a `RunManifest`.
//!
//! Behavior:
//! - Stages run wave by wave (`StageGraph::waves`); a wave starts only after
//!   the previous one has stored all of its outputs.
//! - Scan stages check that their relation exists; dependents read `R.json`
//!   directly. Every other stage reads its inputs, maps each record, groups
//!   the emitted pairs by key, reduces each group (when the operator has a
//!   reduce phase) and stores the result as `tmpN`.
//! - A failed stage is re-run up to `stage_retries` times before the plan is
//!   aborted.
//! - Intermediate outputs are deleted once the root stage has been read back,
//!   unless `keep_intermediates` is set.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use ramr_core::config::EngineConfig;
use ramr_core::dictionary::DataDictionary;
use ramr_core::expr::{OperatorKind, RaExpr};
use ramr_core::id::StepId;
use ramr_core::manifest::RunManifest;
use ramr_core::types::Record;

use ramr_io::naming::relation_path;
use ramr_io::records::RecordStore;
use ramr_io::storage::{build_storage, Storage};

use ramr_operators::traits::{OpError, Operator};

use ramr_planner::stage::{OperatorSpec, Stage, StageGraph};

use crate::fail_point;
use crate::metrics;
use crate::replay::{hash_graph, hash_records};
use crate::scheduler::WaveScheduler;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Compile(#[from] ramr_core::Error),

    #[error("operator registry: {0}")]
    Registry(String),

    #[error("stage {step} failed: {source}")]
    Stage { step: u64, source: OpError },

    #[error("storage: {0}")]
    Storage(#[from] ramr_io::Error),

    #[error("invalid plan: {0}")]
    Invalid(String),

    #[error("scheduler: {0}")]
    Scheduler(String),

    #[error("hashing error: {0}")]
    Hash(String),
}

/// What one stage did, for metrics and the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub step: StepId,
    pub kind: OperatorKind,
    pub records_in: usize,
    pub records_out: usize,
    pub attempts: usize,
    pub elapsed_ms: u64,
}

/// Root stage records plus the run manifest.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<Record>,
    pub manifest: RunManifest,
    pub reports: Vec<StageReport>,
}

/// Engine owns the configuration and the record store stages run against.
pub struct Engine {
    cfg: EngineConfig,
    store: RecordStore,
}

impl Engine {
    /// Build an engine whose storage follows `cfg.exec_env`.
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        cfg.validate()?;
        let storage = build_storage(&cfg)?;
        Ok(Self::with_storage(cfg, storage))
    }

    /// Build an engine over an existing storage backend (tests pre-populate
    /// MOCK storage this way).
    pub fn with_storage(cfg: EngineConfig, storage: Arc<dyn Storage>) -> Self {
        let store = RecordStore::new(storage, cfg.exec_env);
        Self { cfg, store }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Optimize, compile and run a plan.
    pub fn run_plan(&self, plan: RaExpr, dd: &DataDictionary) -> Result<RunOutput, ExecError> {
        let optimized = ramr_planner::rules::optimize(plan, dd);
        let graph = ramr_planner::compile::compile(&optimized)?;
        self.run(&graph)
    }

    /// Execute a compiled graph and return the root stage's records.
    pub fn run(&self, graph: &StageGraph) -> Result<RunOutput, ExecError> {
        let plan_hash = hash_graph(graph)?;
        let manifest = RunManifest::new(plan_hash, now_millis());
        info!(
            stages = graph.len(),
            env = %self.cfg.exec_env,
            plan = %plan_hash,
            "running stage graph"
        );

        let executed = self.run_waves(graph);
        let collected = executed.and_then(|reports| {
            let records = self.stage_records(graph, graph.root())?;
            Ok((reports, records))
        });

        if !self.cfg.keep_intermediates {
            self.cleanup(graph);
        }
        let (reports, records) = collected?;

        let digest = hash_records(&records)?;
        let manifest = manifest.finish(now_millis(), reports.len(), records.len(), Some(digest));
        metrics::emit_span(
            "run_finished",
            &[
                ("stages", reports.len().to_string()),
                ("records", records.len().to_string()),
                ("duration_ms", manifest.duration_ms().to_string()),
            ],
        );
        info!(
            records = records.len(),
            duration_ms = manifest.duration_ms(),
            "stage graph finished"
        );

        Ok(RunOutput {
            records,
            manifest,
            reports,
        })
    }

    fn run_waves(&self, graph: &StageGraph) -> Result<Vec<StageReport>, ExecError> {
        let scheduler = WaveScheduler::new(self.cfg.max_parallel_tasks)?;
        let graph_arc = Arc::new(graph.clone());
        let mut reports = Vec::with_capacity(graph.len());

        for (i, wave) in graph.waves().into_iter().enumerate() {
            debug!(wave = i, stages = wave.len(), "starting wave");
            let stages = wave
                .iter()
                .map(|step| {
                    graph
                        .get(*step)
                        .cloned()
                        .ok_or_else(|| ExecError::Invalid(format!("no stage for {step}")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let store = self.store.clone();
            let graph = Arc::clone(&graph_arc);
            let retries = self.cfg.stage_retries;
            let wave_reports = scheduler.run_wave(stages, move |stage| {
                run_with_retries(&store, &graph, &stage, retries)
            })?;

            for report in &wave_reports {
                metrics::record_stage(report);
            }
            reports.extend(wave_reports);
        }
        Ok(reports)
    }

    /// Records a stage produced, wherever they are stored.
    fn stage_records(&self, graph: &StageGraph, step: StepId) -> Result<Vec<Record>, ExecError> {
        read_stage_output(&self.store, graph, step)
    }

    fn cleanup(&self, graph: &StageGraph) {
        for stage in graph.stages() {
            if matches!(stage.spec, OperatorSpec::Scan { .. }) {
                continue;
            }
            if let Err(e) = self.store.remove_output(stage.step) {
                warn!(step = stage.step.get(), error = %e, "could not remove intermediate output");
            }
        }
    }
}

fn read_stage_output(
    store: &RecordStore,
    graph: &StageGraph,
    step: StepId,
) -> Result<Vec<Record>, ExecError> {
    let stage = graph
        .get(step)
        .ok_or_else(|| ExecError::Invalid(format!("no stage for {step}")))?;
    let records = match &stage.spec {
        OperatorSpec::Scan { relation } => store.read_relation(relation)?,
        _ => store.read_output(step)?,
    };
    Ok(records)
}

fn run_with_retries(
    store: &RecordStore,
    graph: &StageGraph,
    stage: &Stage,
    retries: usize,
) -> Result<StageReport, ExecError> {
    let started = Instant::now();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match execute_stage(store, graph, stage) {
            Ok((records_in, records_out)) => {
                return Ok(StageReport {
                    step: stage.step,
                    kind: stage.kind(),
                    records_in,
                    records_out,
                    attempts: attempt,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
            Err(e) if attempt <= retries => {
                warn!(step = stage.step.get(), attempt, error = %e, "stage failed; retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run one stage to completion. Returns `(records_in, records_out)`.
fn execute_stage(
    store: &RecordStore,
    graph: &StageGraph,
    stage: &Stage,
) -> Result<(usize, usize), ExecError> {
    let step = stage.step;
    fail_point!(
        format!("stage_start:{}", stage.label),
        ExecError::Stage {
            step: step.get(),
            source: OpError::Exec("injected failure".into()),
        }
    );

    let op = match ramr_operators::build(&stage.spec)
        .map_err(|e| ExecError::Registry(format!("{}: {e}", stage.spec)))?
    {
        Some(op) => op,
        None => return check_scan(store, stage),
    };

    let mut inputs = Vec::new();
    for dep in &stage.depends_on {
        inputs.extend(read_stage_output(store, graph, *dep)?);
    }
    let records_in = inputs.len();

    let output = map_reduce(op.as_ref(), inputs).map_err(|source| ExecError::Stage {
        step: step.get(),
        source,
    })?;
    let path = store.write_output(step, &output)?;
    debug!(
        step = step.get(),
        op = op.name(),
        records_in,
        records_out = output.len(),
        %path,
        "stage done"
    );
    Ok((records_in, output.len()))
}

fn check_scan(store: &RecordStore, stage: &Stage) -> Result<(usize, usize), ExecError> {
    let OperatorSpec::Scan { relation } = &stage.spec else {
        return Err(ExecError::Invalid(format!("{} has no operator", stage.step)));
    };
    let path = relation_path(relation);
    if !store.storage().exists(&path)? {
        return Err(ramr_io::Error::Storage(format!("relation file {path} not found")).into());
    }
    debug!(step = stage.step.get(), %path, "scan input present");
    Ok((0, 0))
}

/// Map every record, group the pairs by key, then reduce each group.
pub fn map_reduce(op: &dyn Operator, inputs: Vec<Record>) -> Result<Vec<Record>, OpError> {
    if !op.has_reduce() {
        let mut out = Vec::with_capacity(inputs.len());
        for rec in &inputs {
            out.extend(op.map(rec)?.into_iter().map(|(_, r)| r));
        }
        return Ok(out);
    }

    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for rec in &inputs {
        for (key, value) in op.map(rec)? {
            groups.entry(key).or_default().push(value);
        }
    }

    let mut out = Vec::new();
    for (key, values) in groups {
        out.extend(op.reduce(&key, values)?);
    }
    Ok(out)
}

// --- helpers ---

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramr_core::config::ExecEnv;
    use ramr_core::expr::{AttrRef, Condition};
    use ramr_core::types::{tuple_of, Scalar};
    use ramr_io::memory_storage::MemoryStorage;
    use ramr_operators::join::RepartitionJoin;

    fn mock_engine() -> (Engine, MemoryStorage) {
        let storage = MemoryStorage::new();
        let cfg = EngineConfig {
            exec_env: ExecEnv::Mock,
            ..Default::default()
        };
        let engine = Engine::with_storage(cfg, Arc::new(storage.clone()));

        let people = [("Amy", 16), ("Ben", 21), ("Dan", 13)]
            .into_iter()
            .map(|(n, a)| {
                Record::new(
                    "Person",
                    tuple_of([("Person.name", Scalar::from(n)), ("Person.age", Scalar::Int(a))]),
                )
            })
            .collect::<Vec<_>>();
        let eats = [("Amy", "mushroom"), ("Amy", "cheese"), ("Dan", "cheese")]
            .into_iter()
            .map(|(n, p)| {
                Record::new(
                    "Eats",
                    tuple_of([("Eats.name", Scalar::from(n)), ("Eats.pizza", Scalar::from(p))]),
                )
            })
            .collect::<Vec<_>>();
        engine.store().write_relation("Person", &people).unwrap();
        engine.store().write_relation("Eats", &eats).unwrap();
        (engine, storage)
    }

    fn age(v: i64) -> Condition {
        Condition::eq(Condition::attr(AttrRef::bare("age")), Condition::int_lit(v))
    }

    #[test]
    fn select_plan_end_to_end() {
        let (engine, storage) = mock_engine();
        let out = engine
            .run_plan(RaExpr::select(age(16), RaExpr::scan("Person")), &DataDictionary::new())
            .unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].tuple["Person.name"], Scalar::from("Amy"));
        assert_eq!(out.manifest.stages_run, 2);
        assert_eq!(out.manifest.output_records, 1);
        // Only the two base relations remain.
        assert_eq!(storage.len().unwrap(), 2);
    }

    #[test]
    fn join_plan_end_to_end() {
        let (engine, _) = mock_engine();
        let plan = RaExpr::select(
            Condition::attr_eq(AttrRef::new("Person", "name"), AttrRef::new("Eats", "name")),
            RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")),
        );
        let out = engine.run_plan(plan, &DataDictionary::new()).unwrap();
        assert_eq!(out.records.len(), 3);
        assert!(out.records.iter().all(|r| r.label == "Person,Eats"));
    }

    #[test]
    fn unconverted_cross_never_runs() {
        let (engine, _) = mock_engine();
        let plan = RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats"));
        assert!(matches!(
            engine.run_plan(plan, &DataDictionary::new()),
            Err(ExecError::Compile(ramr_core::Error::UnsupportedOperator(OperatorKind::Cross)))
        ));
    }

    #[test]
    fn missing_relation_fails_the_plan() {
        let (engine, _) = mock_engine();
        let out = engine.run_plan(RaExpr::scan("Serves"), &DataDictionary::new());
        assert!(matches!(out, Err(ExecError::Storage(_))));
    }

    #[test]
    fn attribute_resolution_failure_is_a_stage_error() {
        let (engine, _) = mock_engine();
        let plan = RaExpr::select(
            Condition::eq(Condition::attr(AttrRef::bare("price")), Condition::int_lit(9)),
            RaExpr::scan("Person"),
        );
        assert!(matches!(
            engine.run_plan(plan, &DataDictionary::new()),
            Err(ExecError::Stage { step: 1, .. })
        ));
    }

    #[cfg(feature = "async-scheduler")]
    #[tokio::test]
    async fn runs_from_inside_a_tokio_runtime() {
        let (engine, _) = mock_engine();
        let plan = RaExpr::select(
            Condition::attr_eq(AttrRef::new("Person", "name"), AttrRef::new("Eats", "name")),
            RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")),
        );
        let out = engine.run_plan(plan, &DataDictionary::new()).unwrap();
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn intermediates_can_be_kept() {
        let storage = MemoryStorage::new();
        let cfg = EngineConfig {
            exec_env: ExecEnv::Mock,
            keep_intermediates: true,
            ..Default::default()
        };
        let engine = Engine::with_storage(cfg, Arc::new(storage.clone()));
        engine
            .store()
            .write_relation(
                "Person",
                &[Record::new("Person", tuple_of([("Person.age", Scalar::Int(16))]))],
            )
            .unwrap();
        engine
            .run_plan(RaExpr::select(age(16), RaExpr::scan("Person")), &DataDictionary::new())
            .unwrap();
        assert!(storage.exists("tmp1.tmp").unwrap());
    }

    #[test]
    fn map_reduce_groups_by_key() {
        let op = RepartitionJoin::new(
            &Condition::attr_eq(AttrRef::new("L", "k"), AttrRef::new("R", "k")),
            "L",
            "R",
        )
        .unwrap();
        let rec = |label: &str, k: i64, v: i64| {
            Record::new(
                label,
                tuple_of([
                    (format!("{label}.k"), Scalar::Int(k)),
                    (format!("{label}.v"), Scalar::Int(v)),
                ]),
            )
        };
        let inputs = vec![
            rec("L", 1, 1),
            rec("L", 1, 2),
            rec("R", 1, 3),
            rec("R", 1, 4),
            rec("R", 1, 5),
            rec("L", 2, 6),
        ];
        let out = map_reduce(&op, inputs).unwrap();
        assert_eq!(out.len(), 6);
    }

    #[cfg(feature = "failpoints")]
    #[test]
    fn failed_stage_is_retried() {
        let storage = MemoryStorage::new();
        let cfg = EngineConfig {
            exec_env: ExecEnv::Mock,
            stage_retries: 2,
            ..Default::default()
        };
        let engine = Engine::with_storage(cfg, Arc::new(storage));
        engine
            .store()
            .write_relation("Flaky", &[Record::new("Flaky", tuple_of([("Flaky.x", Scalar::Int(1))]))])
            .unwrap();

        crate::failpoints::arm("stage_start:Flaky", 2);
        let out = engine
            .run_plan(
                RaExpr::project(vec![AttrRef::new("Flaky", "x")], RaExpr::scan("Flaky")),
                &DataDictionary::new(),
            )
            .unwrap();
        crate::failpoints::disarm("stage_start:Flaky");
        assert_eq!(out.records.len(), 1);
        assert!(out.reports.iter().any(|r| r.attempts > 1));
    }
}

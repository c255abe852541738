//! Shared helpers for integration tests: the pizza dataset, its data
//! dictionary, engines over each storage backend, and an in-memory reference
//! evaluator for relational-algebra trees.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use ramr_core::config::{EngineConfig, ExecEnv};
use ramr_core::dictionary::{AttrType, DataDictionary};
use ramr_core::expr::{AttrRef, Condition, RaExpr};
use ramr_core::types::{Record, Tuple};
use ramr_exec::Engine;
use ramr_io::memory_storage::MemoryStorage;
use ramr_io::records::decode_records;
use ramr_operators::eval::{eval_condition, lookup};

pub const RELATIONS: [&str; 3] = ["Person", "Eats", "Serves"];

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

pub fn pizza_dictionary() -> DataDictionary {
    DataDictionary::new()
        .with_relation(
            "Person",
            [
                ("name", AttrType::String),
                ("age", AttrType::Integer),
                ("gender", AttrType::String),
            ],
        )
        .with_relation("Eats", [("name", AttrType::String), ("pizza", AttrType::String)])
        .with_relation(
            "Serves",
            [
                ("pizzeria", AttrType::String),
                ("pizza", AttrType::String),
                ("price", AttrType::Integer),
            ],
        )
}

/// Base relations read straight from `tests/data`.
pub fn pizza_relations() -> BTreeMap<String, Vec<Record>> {
    RELATIONS
        .iter()
        .map(|rel| {
            let path = data_dir().join(format!("{rel}.json"));
            let bytes = fs::read(&path).expect("read test relation");
            let records = decode_records(&path.display().to_string(), &bytes)
                .expect("decode test relation");
            (rel.to_string(), records)
        })
        .collect()
}

/// A throwaway directory holding a copy of the pizza data.
pub fn scratch_data_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ramr-it-{}-{}-{}",
        tag,
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));
    fs::create_dir_all(&dir).expect("create scratch dir");
    for rel in RELATIONS {
        let name = format!("{rel}.json");
        fs::copy(data_dir().join(&name), dir.join(&name)).expect("copy relation");
    }
    dir
}

pub fn engine_for(env: ExecEnv, tag: &str) -> (Engine, Option<PathBuf>) {
    match env {
        ExecEnv::Mock => {
            let storage = MemoryStorage::new();
            let cfg = EngineConfig {
                exec_env: ExecEnv::Mock,
                ..Default::default()
            };
            let engine = Engine::with_storage(cfg, Arc::new(storage));
            for (rel, records) in pizza_relations() {
                engine
                    .store()
                    .write_relation(&rel, &records)
                    .expect("seed mock storage");
            }
            (engine, None)
        }
        ExecEnv::Local | ExecEnv::Distributed => {
            let dir = scratch_data_dir(tag);
            let cfg = EngineConfig {
                exec_env: env,
                data_dir: dir.display().to_string(),
                ..Default::default()
            };
            (Engine::new(cfg).expect("engine"), Some(dir))
        }
    }
}

/// Run `plan` under every execution environment and check they agree.
pub fn run_everywhere(plan: &RaExpr, tag: &str) -> Vec<Record> {
    let mut seen: Option<BTreeSet<String>> = None;
    let mut last = Vec::new();
    for env in [ExecEnv::Mock, ExecEnv::Local, ExecEnv::Distributed] {
        let (engine, dir) = engine_for(env, tag);
        let output = engine
            .run_plan(plan.clone(), &pizza_dictionary())
            .unwrap_or_else(|e| panic!("{env} run failed: {e}"));
        let tuples = tuple_set(&output.records);
        if let Some(prev) = &seen {
            assert_eq!(prev, &tuples, "{env} disagrees with earlier environments");
        }
        seen = Some(tuples);
        last = output.records;
        if let Some(dir) = dir {
            let _ = fs::remove_dir_all(dir);
        }
    }
    last
}

pub fn tuple_set(records: &[Record]) -> BTreeSet<String> {
    records
        .iter()
        .map(|r| r.tuple_json().expect("tuple json"))
        .collect()
}

pub fn tuples(records: &[Record]) -> Vec<serde_json::Value> {
    records
        .iter()
        .map(|r| serde_json::to_value(&r.tuple).expect("tuple value"))
        .collect()
}

// --- plan builders ---

pub fn attr(s: &str) -> AttrRef {
    s.parse().expect("attribute reference")
}

pub fn eq_str(a: &str, v: &str) -> Condition {
    Condition::eq(Condition::attr(attr(a)), Condition::str_lit(v))
}

pub fn eq_int(a: &str, v: i64) -> Condition {
    Condition::eq(Condition::attr(attr(a)), Condition::int_lit(v))
}

pub fn eq_attr(a: &str, b: &str) -> Condition {
    Condition::attr_eq(attr(a), attr(b))
}

pub fn all_of(conds: Vec<Condition>) -> Condition {
    Condition::conjunction(conds).expect("at least one condition")
}

/// `Person × Eats × Serves`, left-deep, the way a FROM list is lowered.
pub fn person_eats_serves() -> RaExpr {
    RaExpr::cross(
        RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")),
        RaExpr::scan("Serves"),
    )
}

// --- reference evaluator ---

/// Evaluate `expr` directly over `relations`, cross products included.
pub fn evaluate(expr: &RaExpr, relations: &BTreeMap<String, Vec<Record>>) -> Vec<Record> {
    match expr {
        RaExpr::Scan { relation } => relations.get(relation).cloned().unwrap_or_default(),
        RaExpr::Select { condition, input } => evaluate(input, relations)
            .into_iter()
            .filter(|r| eval_condition(condition, r).expect("condition"))
            .collect(),
        RaExpr::Project { attributes, input } => {
            let mut seen = BTreeSet::new();
            let mut out = Vec::new();
            for rec in evaluate(input, relations) {
                let tuple: Tuple = attributes
                    .iter()
                    .map(|a| {
                        let (k, v) = lookup(a, &rec).expect("projected attribute");
                        (k.clone(), v.clone())
                    })
                    .collect();
                let projected = Record::new(rec.label.clone(), tuple);
                if seen.insert(projected.tuple_json().expect("json")) {
                    out.push(projected);
                }
            }
            out
        }
        RaExpr::Rename { alias, input } => evaluate(input, relations)
            .into_iter()
            .map(|rec| {
                let tuple = rec
                    .tuple
                    .into_iter()
                    .map(|(k, v)| {
                        let name = k.split_once('.').map_or(k.as_str(), |(_, n)| n).to_string();
                        (format!("{alias}.{name}"), v)
                    })
                    .collect();
                Record::new(alias.clone(), tuple)
            })
            .collect(),
        RaExpr::Cross { left, right } => cross(
            evaluate(left, relations),
            evaluate(right, relations),
            &expr.provenance(),
        ),
        RaExpr::Join {
            left,
            condition,
            right,
        } => cross(
            evaluate(left, relations),
            evaluate(right, relations),
            &expr.provenance(),
        )
        .into_iter()
        .filter(|r| eval_condition(condition, r).expect("join condition"))
        .collect(),
    }
}

fn cross(left: Vec<Record>, right: Vec<Record>, label: &str) -> Vec<Record> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in &left {
        for r in &right {
            let mut tuple = l.tuple.clone();
            tuple.extend(r.tuple.clone());
            out.push(Record::new(label, tuple));
        }
    }
    out
}

//! End-to-end queries over the pizza dataset, run under MOCK, LOCAL and
//! DISTRIBUTED storage.

mod common;

use common::*;
use ramr_core::config::ExecEnv;
use ramr_core::expr::RaExpr;
use serde_json::json;

#[test]
fn select_everyone() {
    let out = run_everywhere(&RaExpr::scan("Person"), "all");
    assert_eq!(out.len(), 9);
}

#[test]
fn select_person_age_16() {
    let plan = RaExpr::select(eq_int("age", 16), RaExpr::scan("Person"));
    let out = run_everywhere(&plan, "age16");
    assert_eq!(out.len(), 1);
    assert_eq!(tuples(&out)[0]["Person.name"], json!("Amy"));
}

#[test]
fn select_person_gender_and_age() {
    let plan = RaExpr::select(
        all_of(vec![eq_str("gender", "female"), eq_int("age", 16)]),
        RaExpr::scan("Person"),
    );
    assert_eq!(run_everywhere(&plan, "gender_age").len(), 1);
}

#[test]
fn project_name() {
    let plan = RaExpr::project(vec![attr("name")], RaExpr::scan("Person"));
    assert_eq!(run_everywhere(&plan, "name").len(), 9);
}

#[test]
fn project_name_age() {
    let plan = RaExpr::project(vec![attr("name"), attr("age")], RaExpr::scan("Person"));
    let out = run_everywhere(&plan, "name_age");
    assert_eq!(out.len(), 9);
    assert!(tuples(&out).contains(&json!({"Person.name": "Amy", "Person.age": 16})));
}

#[test]
fn person_join_eats() {
    let plan = RaExpr::select(
        eq_attr("Person.name", "Eats.name"),
        RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")),
    );
    let out = run_everywhere(&plan, "p_join_e");
    assert_eq!(out.len(), 20);
    assert!(out.iter().all(|r| r.label == "Person,Eats"));
}

#[test]
fn project_person_join_eats_join_serves() {
    let plan = RaExpr::project(
        vec![attr("Person.name"), attr("Serves.pizza")],
        RaExpr::select(
            all_of(vec![
                eq_attr("Person.name", "Eats.name"),
                eq_attr("Eats.pizza", "Serves.pizza"),
            ]),
            person_eats_serves(),
        ),
    );
    assert_eq!(run_everywhere(&plan, "three_way_project").len(), 20);
}

#[test]
fn project_name_of_renamed_person() {
    let plan = RaExpr::project(
        vec![attr("X.name")],
        RaExpr::rename("X", RaExpr::scan("Person")),
    );
    let out = run_everywhere(&plan, "rename");
    assert_eq!(out.len(), 9);
    assert!(tuples(&out).contains(&json!({"X.name": "Amy"})));
}

#[test]
fn mushroom_lovers() {
    let plan = RaExpr::project(
        vec![attr("Person.name"), attr("Serves.pizzeria")],
        RaExpr::select(
            all_of(vec![
                eq_str("Eats.pizza", "mushroom"),
                eq_attr("Person.name", "Eats.name"),
                eq_attr("Eats.pizza", "Serves.pizza"),
            ]),
            person_eats_serves(),
        ),
    );
    assert_eq!(run_everywhere(&plan, "mushroom_lovers").len(), 8);
}

#[test]
fn mushroom_eaters_three_way() {
    let plan = RaExpr::select(
        all_of(vec![
            eq_attr("Person.name", "Eats.name"),
            eq_attr("Eats.pizza", "Serves.pizza"),
            eq_str("Eats.pizza", "mushroom"),
        ]),
        person_eats_serves(),
    );
    assert_eq!(run_everywhere(&plan, "mushroom_three_way").len(), 8);
}

#[test]
fn person_join_eats_join_serves_where() {
    let plan = RaExpr::select(
        all_of(vec![
            eq_attr("Person.name", "Eats.name"),
            eq_attr("Eats.pizza", "Serves.pizza"),
            eq_int("Person.age", 16),
            eq_str("Serves.pizzeria", "Little Caesars"),
        ]),
        person_eats_serves(),
    );
    let out = run_everywhere(&plan, "three_way_where");
    assert_eq!(out.len(), 2);
    for t in tuples(&out) {
        assert_eq!(t["Person.name"], json!("Amy"));
        assert_eq!(t["Serves.pizzeria"], json!("Little Caesars"));
    }
}

#[test]
fn unconverted_cross_is_rejected_before_running() {
    let (engine, dir) = engine_for(ExecEnv::Mock, "cross");
    let plan = RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats"));
    assert!(engine.run_plan(plan, &pizza_dictionary()).is_err());
    assert!(dir.is_none());
}

#[test]
fn manifest_describes_the_run() {
    let (engine, dir) = engine_for(ExecEnv::Local, "manifest");
    let plan = RaExpr::select(eq_int("age", 16), RaExpr::scan("Person"));
    let first = engine.run_plan(plan.clone(), &pizza_dictionary()).unwrap();
    let second = engine.run_plan(plan, &pizza_dictionary()).unwrap();

    assert_eq!(first.manifest.stages_run, 2);
    assert_eq!(first.manifest.output_records, 1);
    assert_eq!(first.manifest.plan_hash, second.manifest.plan_hash);
    assert_eq!(first.manifest.outputs_digest, second.manifest.outputs_digest);
    assert_ne!(first.manifest.id, second.manifest.id);

    // Intermediates are gone; only the base relations are left.
    let dir = dir.unwrap();
    let mut left: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["Eats.json", "Person.json", "Serves.json"]);
    let _ = std::fs::remove_dir_all(dir);
}

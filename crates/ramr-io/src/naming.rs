//! Storage path conventions.
//!
//! - base relation `R`: `R.json`
//! - output of step `N`: `tmpN` on distributed storage (a directory of
//!   `part-NNNNN` files), `tmpN.tmp` on local and mock storage.

use ramr_core::config::ExecEnv;
use ramr_core::id::StepId;

pub fn relation_path(relation: &str) -> String {
    format!("{relation}.json")
}

pub fn output_path(step: StepId, env: ExecEnv) -> String {
    match env {
        ExecEnv::Distributed => format!("tmp{}", step.get()),
        ExecEnv::Local | ExecEnv::Mock => format!("tmp{}.tmp", step.get()),
    }
}

/// Name of part `index` inside a distributed output directory.
pub fn part_path(dir: &str, index: usize) -> String {
    format!("{dir}/part-{index:05}")
}

//! YAML plan files: optional engine settings, a data dictionary and a plan.
//!
//! Example:
//! ```yaml
//! config:
//!   exec_env: local
//!   data_dir: tests/data
//! dictionary:
//!   Person: { name: string, age: integer, gender: string }
//! plan:
//!   project:
//!     attributes: ["Person.name"]
//!     input:
//!       select:
//!         condition:
//!           binary:
//!             op: eq
//!             left: { attr: "age" }
//!             right: { literal: { int: 16 } }
//!         input:
//!           scan: { relation: Person }
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml;

use ramr_core::config::{EngineConfig, ExecEnv};
use ramr_core::dictionary::DataDictionary;
use ramr_core::expr::RaExpr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub config: Option<PipelineConfig>,
    #[serde(default)]
    pub dictionary: DataDictionary,
    pub plan: RaExpr,
}

/// Engine settings a plan file may pin; unset fields keep the caller's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub exec_env: Option<ExecEnv>,
    pub data_dir: Option<String>,
    pub max_parallel_tasks: Option<usize>,
    pub stage_retries: Option<usize>,
    pub keep_intermediates: Option<bool>,
}

impl PipelineConfig {
    /// Overlay the settings present in the file onto `cfg`.
    pub fn apply_to(&self, cfg: &mut EngineConfig) {
        if let Some(env) = self.exec_env {
            cfg.exec_env = env;
        }
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        if let Some(n) = self.max_parallel_tasks {
            cfg.max_parallel_tasks = n;
        }
        if let Some(n) = self.stage_retries {
            cfg.stage_retries = n;
        }
        if let Some(keep) = self.keep_intermediates {
            cfg.keep_intermediates = keep;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPipeline {
    pub plan: RaExpr,
    pub dictionary: DataDictionary,
    pub config: PipelineConfig,
}

pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<ParsedPipeline, serde_yaml::Error> {
    let doc: Pipeline = serde_yaml::from_str(yaml_src)?;
    Ok(ParsedPipeline {
        plan: doc.plan,
        dictionary: doc.dictionary,
        config: doc.config.unwrap_or_default(),
    })
}

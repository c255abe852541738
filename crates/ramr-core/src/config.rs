//! Engine configuration that downstream crates can serialize/deserialize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Where scan inputs and inter-stage outputs are read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecEnv {
    /// Plain files under the data directory.
    #[default]
    Local,
    /// Distributed-filesystem layout: each output is a directory of part files.
    #[serde(alias = "hdfs")]
    Distributed,
    /// In-memory storage, for tests.
    Mock,
}

impl FromStr for ExecEnv {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ExecEnv::Local),
            "distributed" | "hdfs" => Ok(ExecEnv::Distributed),
            "mock" => Ok(ExecEnv::Mock),
            other => Err(Error::Config(format!("unknown execution environment '{other}'"))),
        }
    }
}

impl fmt::Display for ExecEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecEnv::Local => f.write_str("LOCAL"),
            ExecEnv::Distributed => f.write_str("DISTRIBUTED"),
            ExecEnv::Mock => f.write_str("MOCK"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage flavour for inputs and intermediates.
    pub exec_env: ExecEnv,

    /// Root directory holding `R.json` inputs and `tmpN` outputs (ignored by MOCK).
    pub data_dir: String,

    /// Upper bound on stages of one wave running at the same time.
    pub max_parallel_tasks: usize,

    /// How many times a failed stage is re-run before the plan is aborted.
    pub stage_retries: usize,

    /// Leave `tmpN` outputs in place after the plan finishes.
    pub keep_intermediates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exec_env: ExecEnv::Local,
            data_dir: "data".to_string(),
            max_parallel_tasks: 4,
            stage_retries: 1,
            keep_intermediates: false,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RAMR_EXEC_ENV`: `local`, `distributed` (or `hdfs`), `mock`
    /// - `RAMR_DATA_DIR`: data root directory
    /// - `RAMR_MAX_PARALLEL_TASKS`: max stages running at once
    /// - `RAMR_STAGE_RETRIES`: retries per failed stage
    /// - `RAMR_KEEP_INTERMEDIATES`: `true`/`false`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RAMR_EXEC_ENV") {
            if let Ok(v) = s.parse::<ExecEnv>() {
                cfg.exec_env = v;
            }
        }

        if let Ok(s) = std::env::var("RAMR_DATA_DIR") {
            cfg.data_dir = s;
        }

        if let Ok(s) = std::env::var("RAMR_MAX_PARALLEL_TASKS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_parallel_tasks = v;
            }
        }

        if let Ok(s) = std::env::var("RAMR_STAGE_RETRIES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.stage_retries = v;
            }
        }

        if let Ok(s) = std::env::var("RAMR_KEEP_INTERMEDIATES") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.keep_intermediates = v;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_parallel_tasks == 0 {
            return Err(Error::Config("max_parallel_tasks must be at least 1".into()));
        }
        if self.exec_env != ExecEnv::Mock && self.data_dir.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} execution needs a data directory",
                self.exec_env
            )));
        }
        Ok(())
    }
}

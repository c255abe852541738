//! Compiled stage descriptors.
//!
//! A `StageGraph` is what the execution environment receives: one `Stage` per
//! plan node, keyed by `StepId`, each carrying a structured `OperatorSpec`
//! that a worker can instantiate without seeing the rest of the plan.

use std::collections::BTreeMap;
use std::fmt;

use ramr_core::expr::{AttrRef, Condition, OperatorKind};
use ramr_core::id::StepId;
use ramr_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Per-stage operator description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum OperatorSpec {
    Scan {
        relation: String,
    },
    Select {
        condition: Condition,
    },
    Project {
        attributes: Vec<AttrRef>,
    },
    Rename {
        alias: String,
    },
    Join {
        condition: Condition,
        left_label: String,
        right_label: String,
    },
}

impl OperatorSpec {
    pub fn kind(&self) -> OperatorKind {
        match self {
            OperatorSpec::Scan { .. } => OperatorKind::Scan,
            OperatorSpec::Select { .. } => OperatorKind::Select,
            OperatorSpec::Project { .. } => OperatorKind::Project,
            OperatorSpec::Rename { .. } => OperatorKind::Rename,
            OperatorSpec::Join { .. } => OperatorKind::Join,
        }
    }

    /// Whether the stage runs a reduce phase after its map phase.
    pub fn has_reduce(&self) -> bool {
        matches!(self, OperatorSpec::Project { .. } | OperatorSpec::Join { .. })
    }
}

impl fmt::Display for OperatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorSpec::Scan { relation } => write!(f, "scan {}", relation),
            OperatorSpec::Select { condition } => write!(f, "select [{}]", condition),
            OperatorSpec::Project { attributes } => {
                let attrs: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
                write!(f, "project [{}]", attrs.join(", "))
            }
            OperatorSpec::Rename { alias } => write!(f, "rename [{}]", alias),
            OperatorSpec::Join {
                condition,
                left_label,
                right_label,
            } => write!(f, "join [{}] {} x {}", condition, left_label, right_label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub step: StepId,
    pub spec: OperatorSpec,
    /// Provenance label of the records this stage emits.
    pub label: String,
    /// Input stages, left before right.
    pub depends_on: Vec<StepId>,
}

impl Stage {
    pub fn kind(&self) -> OperatorKind {
        self.spec.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageGraph {
    root: StepId,
    stages: Vec<Stage>,
}

impl StageGraph {
    /// Build a graph, sorting stages by step id and checking that ids are
    /// unique, the root exists and every dependency points at a stage with a
    /// larger step id.
    pub fn new(root: StepId, mut stages: Vec<Stage>) -> Result<Self> {
        stages.sort_by_key(|s| s.step);
        if stages.windows(2).any(|w| w[0].step == w[1].step) {
            return Err(Error::Invariant("duplicate step id in stage graph".into()));
        }
        let graph = Self { root, stages };
        if graph.get(root).is_none() {
            return Err(Error::Invariant(format!("root {root} has no stage")));
        }
        for stage in &graph.stages {
            if let Some(missing) = stage.depends_on.iter().find(|d| graph.get(**d).is_none()) {
                return Err(Error::Invariant(format!(
                    "{} depends on unknown {}",
                    stage.step, missing
                )));
            }
            // Inputs are numbered after their consumer; this also rules out cycles.
            if let Some(early) = stage.depends_on.iter().find(|d| **d <= stage.step) {
                return Err(Error::Invariant(format!(
                    "{} depends on {}, which is not numbered after it",
                    stage.step, early
                )));
            }
        }
        Ok(graph)
    }

    pub fn root(&self) -> StepId {
        self.root
    }

    /// Stages in ascending step order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, step: StepId) -> Option<&Stage> {
        self.stages
            .binary_search_by_key(&step, |s| s.step)
            .ok()
            .map(|i| &self.stages[i])
    }

    pub fn root_stage(&self) -> Option<&Stage> {
        self.get(self.root)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Group stages into barrier waves: a stage lands in the first wave after
    /// all of its dependencies. Scans form wave 0; the root is in the last.
    pub fn waves(&self) -> Vec<Vec<StepId>> {
        // Children always carry larger ids than their parent, so walking in
        // descending order sees every dependency first.
        let mut depth: BTreeMap<StepId, usize> = BTreeMap::new();
        for stage in self.stages.iter().rev() {
            let d = stage
                .depends_on
                .iter()
                .filter_map(|dep| depth.get(dep))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(stage.step, d);
        }

        let levels = depth.values().copied().max().map_or(0, |m| m + 1);
        let mut waves = vec![Vec::new(); levels];
        for (step, d) in depth {
            waves[d].push(step);
        }
        waves
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(src: &str) -> Result<Self> {
        let graph: StageGraph = serde_json::from_str(src)?;
        StageGraph::new(graph.root, graph.stages)
    }
}

impl fmt::Display for StageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.stages {
            write!(f, "{:>4}  {:<8} {}", stage.step.get(), stage.label, stage.spec)?;
            if !stage.depends_on.is_empty() {
                let deps: Vec<String> = stage.depends_on.iter().map(|d| d.get().to_string()).collect();
                write!(f, "  <- {}", deps.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

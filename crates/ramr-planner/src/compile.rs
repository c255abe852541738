//! Lowering of an optimized plan into a `StageGraph`.
//!
//! Step ids follow the tree shape: a node gets `step`, its only child (or its
//! left child) `step + 1`, and a join's right child starts right after the
//! left subtree, at `step + 1 + count_steps(left)`.

use ramr_core::expr::{OperatorKind, RaExpr};
use ramr_core::id::StepId;
use ramr_core::{Error, Result};
use tracing::debug;

use crate::stage::{OperatorSpec, Stage, StageGraph};

/// Number of stages `expr` compiles to.
///
/// Fails on `Cross`, which has no stage form.
pub fn count_steps(expr: &RaExpr) -> Result<u64> {
    match expr {
        RaExpr::Scan { .. } => Ok(1),
        RaExpr::Select { input, .. }
        | RaExpr::Project { input, .. }
        | RaExpr::Rename { input, .. } => Ok(1 + count_steps(input)?),
        RaExpr::Join { left, right, .. } => Ok(1 + count_steps(left)? + count_steps(right)?),
        RaExpr::Cross { .. } => Err(Error::UnsupportedOperator(OperatorKind::Cross)),
    }
}

/// Compile with the root at `StepId::ROOT`.
pub fn compile(expr: &RaExpr) -> Result<StageGraph> {
    compile_from(expr, StepId::ROOT)
}

/// Compile with the root at `start`.
pub fn compile_from(expr: &RaExpr, start: StepId) -> Result<StageGraph> {
    // Fail before building anything if a cross product survived optimization.
    let total = count_steps(expr)?;

    let mut stages = Vec::with_capacity(total as usize);
    lower(expr, start, &mut stages)?;
    debug!(stages = stages.len(), root = start.get(), "compiled plan");

    StageGraph::new(start, stages)
}

fn lower(expr: &RaExpr, step: StepId, out: &mut Vec<Stage>) -> Result<()> {
    let label = expr.provenance();
    let (spec, depends_on) = match expr {
        RaExpr::Scan { relation } => (
            OperatorSpec::Scan {
                relation: relation.clone(),
            },
            vec![],
        ),
        RaExpr::Select { condition, input } => {
            let child = step.offset(1);
            lower(input, child, out)?;
            (
                OperatorSpec::Select {
                    condition: condition.clone(),
                },
                vec![child],
            )
        }
        RaExpr::Project { attributes, input } => {
            let child = step.offset(1);
            lower(input, child, out)?;
            (
                OperatorSpec::Project {
                    attributes: attributes.clone(),
                },
                vec![child],
            )
        }
        RaExpr::Rename { alias, input } => {
            let child = step.offset(1);
            lower(input, child, out)?;
            (
                OperatorSpec::Rename {
                    alias: alias.clone(),
                },
                vec![child],
            )
        }
        RaExpr::Join {
            left,
            condition,
            right,
        } => {
            let (left_label, right_label) = (left.provenance(), right.provenance());
            if left_label == right_label {
                return Err(Error::Plan(format!(
                    "join inputs both flow under '{left_label}'; rename one side"
                )));
            }
            let left_step = step.offset(1);
            let right_step = step.offset(1 + count_steps(left)?);
            lower(left, left_step, out)?;
            lower(right, right_step, out)?;
            (
                OperatorSpec::Join {
                    condition: condition.clone(),
                    left_label,
                    right_label,
                },
                vec![left_step, right_step],
            )
        }
        RaExpr::Cross { .. } => return Err(Error::UnsupportedOperator(OperatorKind::Cross)),
    };

    out.push(Stage {
        step,
        spec,
        label,
        depends_on,
    });
    Ok(())
}

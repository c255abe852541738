//! OperatorSpec → operator instance.

use ramr_planner::stage::OperatorSpec;

use crate::join::RepartitionJoin;
use crate::project::Project;
use crate::rename::Rename;
use crate::select::Select;
use crate::traits::{OpError, Operator};

/// Instantiate the operator a stage runs. Scans have none: their output is
/// the stored relation itself.
pub fn build(spec: &OperatorSpec) -> Result<Option<Box<dyn Operator>>, OpError> {
    let op: Box<dyn Operator> = match spec {
        OperatorSpec::Scan { .. } => return Ok(None),
        OperatorSpec::Select { condition } => Box::new(Select::new(condition.clone())),
        OperatorSpec::Project { attributes } => Box::new(Project::new(attributes.clone())),
        OperatorSpec::Rename { alias } => Box::new(Rename::new(alias.clone())),
        OperatorSpec::Join {
            condition,
            left_label,
            right_label,
        } => Box::new(RepartitionJoin::new(
            condition,
            left_label.clone(),
            right_label.clone(),
        )?),
    };
    Ok(Some(op))
}

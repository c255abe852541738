//! Attribute lookup and condition evaluation against a single record.
//!
//! Lookup order for an attribute reference:
//! 1. its qualified key (`Rel.attr`), when qualified;
//! 2. the name under the record's own label (`<label>.attr`);
//! 3. for bare names only, the one key ending in `.attr` (or equal to it).
//!
//! Step 3 covers records whose label is a join's composite tag.

use ramr_core::expr::{AttrRef, BinOp, Condition, Literal};
use ramr_core::types::{Record, Scalar};

use crate::traits::OpError;

/// Find the key/value `attr` refers to in `record`, if any.
pub fn lookup<'a>(attr: &AttrRef, record: &'a Record) -> Option<(&'a String, &'a Scalar)> {
    if let Some(key) = attr.qualified_key() {
        if let Some(hit) = record.tuple.get_key_value(&key) {
            return Some(hit);
        }
    }

    let under_label = format!("{}.{}", record.label, attr.name);
    if let Some(hit) = record.tuple.get_key_value(&under_label) {
        return Some(hit);
    }

    if attr.is_qualified() {
        return None;
    }

    let suffix = format!(".{}", attr.name);
    let mut candidates = record
        .tuple
        .iter()
        .filter(|(k, _)| k.ends_with(&suffix) || **k == attr.name);
    match (candidates.next(), candidates.next()) {
        (Some(hit), None) => Some(hit),
        _ => None,
    }
}

/// Like [`lookup`], but a miss is an error.
pub fn resolve<'a>(
    attr: &AttrRef,
    record: &'a Record,
) -> Result<(&'a String, &'a Scalar), OpError> {
    lookup(attr, record).ok_or_else(|| OpError::AttributeResolution {
        attr: attr.to_string(),
        label: record.label.clone(),
    })
}

fn literal_scalar(lit: &Literal) -> Scalar {
    match lit {
        Literal::Str(s) => Scalar::Str(s.clone()),
        Literal::Int(i) => Scalar::Int(*i),
    }
}

fn eval_equality(left: &Condition, right: &Condition, record: &Record) -> Result<bool, OpError> {
    match (left, right) {
        (Condition::Attr(a), Condition::Literal(lit))
        | (Condition::Literal(lit), Condition::Attr(a)) => {
            Ok(resolve(a, record)?.1.matches_literal(lit))
        }
        (Condition::Attr(a), Condition::Attr(b)) => {
            let (_, va) = resolve(a, record)?;
            let (_, vb) = resolve(b, record)?;
            Ok(va.loosely_eq(vb))
        }
        (Condition::Literal(a), Condition::Literal(b)) => {
            Ok(literal_scalar(a).matches_literal(b))
        }
        _ => Err(OpError::Condition(format!(
            "equality needs attribute or literal operands: {} = {}",
            left, right
        ))),
    }
}

/// Evaluate `cond` on `record`. Conjunctions short-circuit left to right.
pub fn eval_condition(cond: &Condition, record: &Record) -> Result<bool, OpError> {
    match cond {
        Condition::Binary {
            op: BinOp::And,
            left,
            right,
        } => Ok(eval_condition(left, record)? && eval_condition(right, record)?),
        Condition::Binary {
            op: BinOp::Eq,
            left,
            right,
        } => eval_equality(left, right, record),
        Condition::Attr(_) | Condition::Literal(_) => Err(OpError::Condition(format!(
            "'{}' is not a predicate",
            cond
        ))),
    }
}

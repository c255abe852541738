//! Repartition equi-join.
//!
//! Map: key every record by the JSON array of its join-attribute values, in
//! conjunct order, keeping its label so reduce can tell the sides apart.
//! Values are keyed in `Scalar::key_form`, so `8` and `8.0` meet; a record
//! with a null join value is dropped.
//! Reduce: split the values into left and right by label, drop duplicate
//! tuples on each side, emit every left × right pair merged under
//! `"<left>,<right>"`. A key seen on one side only yields nothing.

use std::collections::BTreeSet;

use ramr_core::expr::{AttrRef, Condition};
use ramr_core::types::{Record, Scalar};
use serde::{Deserialize, Serialize};

use crate::eval::lookup;
use crate::traits::{KeyedRecord, OpError, Operator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepartitionJoin {
    pub left_label: String,
    pub right_label: String,
    /// One `(a, b)` per atomic `a = b` of the join condition.
    pub on: Vec<(AttrRef, AttrRef)>,
}

impl RepartitionJoin {
    pub fn new(
        condition: &Condition,
        left_label: impl Into<String>,
        right_label: impl Into<String>,
    ) -> Result<Self, OpError> {
        let on = condition
            .conjuncts()
            .into_iter()
            .map(|atom| {
                atom.as_attr_equality()
                    .map(|(a, b)| (a.clone(), b.clone()))
                    .ok_or_else(|| {
                        OpError::Condition(format!("join predicate '{atom}' is not attr = attr"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            left_label: left_label.into(),
            right_label: right_label.into(),
            on,
        })
    }

    pub fn output_label(&self) -> String {
        format!("{},{}", self.left_label, self.right_label)
    }

    /// Qualified names match their exact key only, so `a` never reads the
    /// other side's column; bare names follow `eval::lookup`.
    fn side_value<'a>(attr: &AttrRef, record: &'a Record) -> Option<&'a Scalar> {
        match attr.qualified_key() {
            Some(key) => record.tuple.get(&key),
            None => lookup(attr, record).map(|(_, v)| v),
        }
    }

    fn key_values<'a>(&self, record: &'a Record) -> Result<Vec<&'a Scalar>, OpError> {
        self.on
            .iter()
            .map(|(a, b)| {
                Self::side_value(a, record)
                    .or_else(|| Self::side_value(b, record))
                    .ok_or_else(|| OpError::AttributeResolution {
                        attr: format!("{a} / {b}"),
                        label: record.label.clone(),
                    })
            })
            .collect()
    }
}

/// Keep the first occurrence of every distinct tuple.
fn dedup(records: Vec<Record>) -> Result<Vec<Record>, OpError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(records.len());
    for rec in records {
        if seen.insert(rec.tuple_json()?) {
            out.push(rec);
        }
    }
    Ok(out)
}

impl Operator for RepartitionJoin {
    fn name(&self) -> &'static str {
        "join_repartition"
    }

    fn map(&self, record: &Record) -> Result<Vec<KeyedRecord>, OpError> {
        let key_form = self
            .key_values(record)?
            .into_iter()
            .map(Scalar::key_form)
            .collect::<Option<Vec<_>>>();
        let Some(values) = key_form else {
            return Ok(vec![]);
        };
        let key = serde_json::to_string(&values)?;
        Ok(vec![(key, record.clone())])
    }

    fn has_reduce(&self) -> bool {
        true
    }

    fn reduce(&self, key: &str, values: Vec<Record>) -> Result<Vec<Record>, OpError> {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for rec in values {
            if rec.label == self.left_label {
                left.push(rec);
            } else if rec.label == self.right_label {
                right.push(rec);
            } else {
                return Err(OpError::Exec(format!(
                    "join key {key} got a record labelled '{}', expected '{}' or '{}'",
                    rec.label, self.left_label, self.right_label
                )));
            }
        }
        if left.is_empty() || right.is_empty() {
            return Ok(vec![]);
        }

        let (left, right) = (dedup(left)?, dedup(right)?);
        let label = self.output_label();
        let mut out = Vec::with_capacity(left.len() * right.len());
        for l in &left {
            for r in &right {
                let mut tuple = l.tuple.clone();
                tuple.extend(r.tuple.iter().map(|(k, v)| (k.clone(), v.clone())));
                out.push(Record::new(label.clone(), tuple));
            }
        }
        Ok(out)
    }
}

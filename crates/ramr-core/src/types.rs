//! Runtime values: scalars, tuples and provenance-tagged records.
//!
//! A record travels between stages as one text line:
//! `"<label>\t<json object of qualified key → scalar>"`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::Literal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Equality against a literal, following the literal's representation:
    /// string literals compare textually, integer literals numerically.
    pub fn matches_literal(&self, literal: &Literal) -> bool {
        use Scalar::*;
        match literal {
            Literal::Str(lit) => match self {
                Null => false,
                Str(s) => s == lit,
                other => other.to_string() == *lit,
            },
            Literal::Int(lit) => match self {
                Int(i) => i == lit,
                Float(f) => *f == *lit as f64,
                Str(s) => s.trim().parse::<i64>().map(|v| v == *lit).unwrap_or(false),
                Null | Bool(_) => false,
            },
        }
    }

    /// Attribute-to-attribute equality. Integers and floats compare
    /// numerically; nulls never compare equal.
    pub fn loosely_eq(&self, other: &Scalar) -> bool {
        use Scalar::*;
        match (self, other) {
            (Null, _) | (_, Null) => false,
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
            (a, b) => a == b,
        }
    }

    /// Canonical form for hashing and shuffle keys: two scalars that are
    /// `loosely_eq` have the same key. Integral floats become ints; `None`
    /// for null, which equals nothing.
    pub fn key_form(&self) -> Option<Scalar> {
        match self {
            Scalar::Null => None,
            Scalar::Float(x)
                if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 =>
            {
                Some(Scalar::Int(*x as i64))
            }
            other => Some(other.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

/// Qualified attribute key (`"Rel.attr"`) → value. Ordered, so its JSON form
/// is canonical and can double as a shuffle key.
pub type Tuple = BTreeMap<String, Scalar>;

/// A tuple plus the provenance label it currently flows under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub label: String,
    pub tuple: Tuple,
}

impl Record {
    pub fn new(label: impl Into<String>, tuple: Tuple) -> Self {
        Self {
            label: label.into(),
            tuple,
        }
    }

    /// Canonical JSON of the tuple alone.
    pub fn tuple_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.tuple)?)
    }

    pub fn to_line(&self) -> Result<String> {
        Ok(format!("{}\t{}", self.label, self.tuple_json()?))
    }

    pub fn from_line(line: &str) -> Result<Self> {
        let (label, json) = line
            .split_once('\t')
            .ok_or_else(|| Error::Codec(format!("record line without a tab: '{line}'")))?;
        let tuple: Tuple = serde_json::from_str(json)?;
        Ok(Record::new(label, tuple))
    }
}

/// Build a tuple from `(key, value)` pairs.
pub fn tuple_of<K, V, I>(pairs: I) -> Tuple
where
    K: Into<String>,
    V: Into<Scalar>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

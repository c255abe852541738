//! Data dictionary: relation → attribute → scalar type.
//!
//! Used only to decide which relation owns an unqualified attribute name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    String,
    Integer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataDictionary {
    relations: BTreeMap<String, BTreeMap<String, AttrType>>,
}

impl DataDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper, mostly for tests.
    pub fn with_relation<I, S>(mut self, relation: impl Into<String>, attrs: I) -> Self
    where
        I: IntoIterator<Item = (S, AttrType)>,
        S: Into<String>,
    {
        self.insert_relation(relation, attrs);
        self
    }

    pub fn insert_relation<I, S>(&mut self, relation: impl Into<String>, attrs: I)
    where
        I: IntoIterator<Item = (S, AttrType)>,
        S: Into<String>,
    {
        let attrs = attrs.into_iter().map(|(n, t)| (n.into(), t)).collect();
        self.relations.insert(relation.into(), attrs);
    }

    pub fn from_json(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src)?)
    }

    pub fn contains_relation(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    pub fn attributes(&self, relation: &str) -> Option<&BTreeMap<String, AttrType>> {
        self.relations.get(relation)
    }

    pub fn attr_type(&self, relation: &str, attribute: &str) -> Option<AttrType> {
        self.relations.get(relation)?.get(attribute).copied()
    }

    /// Every relation declaring `attribute`, in name order.
    pub fn relations_with(&self, attribute: &str) -> Vec<&str> {
        self.relations
            .iter()
            .filter(|(_, attrs)| attrs.contains_key(attribute))
            .map(|(rel, _)| rel.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

//! Relational-algebra plan model.
//!
//! `RaExpr` is a plain value tree: every rewrite consumes a tree and returns a
//! new one, so no two passes ever observe a half-rewritten node. Conditions are
//! `Condition` trees built from attribute references, literals and the two
//! binary operators the plan language knows (`=` and `and`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Reference to an attribute, optionally qualified by a relation label.
///
/// Serialized as `"Rel.attr"` or `"attr"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttrRef {
    pub relation: Option<String>,
    pub name: String,
}

impl AttrRef {
    pub fn new(relation: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            relation: Some(relation.into()),
            name: name.into(),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            relation: None,
            name: name.into(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.relation.is_some()
    }

    /// Tuple key for this reference when it is qualified (`"Rel.attr"`).
    pub fn qualified_key(&self) -> Option<String> {
        self.relation
            .as_ref()
            .map(|rel| format!("{}.{}", rel, self.name))
    }

    /// Tuple key for this reference as seen under provenance label `label`.
    pub fn key_under(&self, label: &str) -> String {
        match &self.relation {
            Some(rel) => format!("{}.{}", rel, self.name),
            None => format!("{}.{}", label, self.name),
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relation {
            Some(rel) => write!(f, "{}.{}", rel, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for AttrRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('.') {
            Some((rel, name)) => {
                let (rel, name) = (rel.trim(), name.trim());
                if rel.is_empty() || name.is_empty() || name.contains('.') {
                    return Err(Error::Plan(format!("malformed attribute reference '{s}'")));
                }
                Ok(AttrRef::new(rel, name))
            }
            None if !s.is_empty() => Ok(AttrRef::bare(s)),
            None => Err(Error::Plan("empty attribute reference".into())),
        }
    }
}

impl TryFrom<String> for AttrRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttrRef> for String {
    fn from(attr: AttrRef) -> Self {
        attr.to_string()
    }
}

/// Typed literal. The representation decides how runtime equality is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    Str(String),
    Int(i64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "'{}'", s),
            Literal::Int(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    Eq,
    And,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Eq => f.write_str("="),
            BinOp::And => f.write_str("and"),
        }
    }
}

/// Condition expression used by `Select` and `Join`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Attr(AttrRef),
    Literal(Literal),
    Binary {
        op: BinOp,
        left: Box<Condition>,
        right: Box<Condition>,
    },
}

impl Condition {
    pub fn attr(attr: AttrRef) -> Self {
        Condition::Attr(attr)
    }

    pub fn str_lit(value: impl Into<String>) -> Self {
        Condition::Literal(Literal::Str(value.into()))
    }

    pub fn int_lit(value: i64) -> Self {
        Condition::Literal(Literal::Int(value))
    }

    pub fn eq(left: Condition, right: Condition) -> Self {
        Condition::Binary {
            op: BinOp::Eq,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::Binary {
            op: BinOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `Rel.attr = Rel.attr` shorthand.
    pub fn attr_eq(left: AttrRef, right: AttrRef) -> Self {
        Condition::eq(Condition::Attr(left), Condition::Attr(right))
    }

    /// True for attribute references and literals.
    pub fn is_operand(&self) -> bool {
        matches!(self, Condition::Attr(_) | Condition::Literal(_))
    }

    /// `operand = operand`.
    pub fn is_atomic(&self) -> bool {
        match self {
            Condition::Binary {
                op: BinOp::Eq,
                left,
                right,
            } => left.is_operand() && right.is_operand(),
            _ => false,
        }
    }

    /// Operands of an atomic equality, `None` for anything else.
    pub fn as_equality(&self) -> Option<(&Condition, &Condition)> {
        match self {
            Condition::Binary {
                op: BinOp::Eq,
                left,
                right,
            } if self.is_atomic() => Some((left, right)),
            _ => None,
        }
    }

    /// Both sides of an atomic `attr = attr`, `None` otherwise.
    pub fn as_attr_equality(&self) -> Option<(&AttrRef, &AttrRef)> {
        match self.as_equality()? {
            (Condition::Attr(l), Condition::Attr(r)) => Some((l, r)),
            _ => None,
        }
    }

    /// Flatten an `and` tree into its conjuncts, left to right, regardless of
    /// how the chain is nested.
    pub fn conjuncts(&self) -> Vec<&Condition> {
        fn walk<'a>(cond: &'a Condition, acc: &mut Vec<&'a Condition>) {
            match cond {
                Condition::Binary {
                    op: BinOp::And,
                    left,
                    right,
                } => {
                    walk(left, acc);
                    walk(right, acc);
                }
                other => acc.push(other),
            }
        }
        let mut acc = Vec::new();
        walk(self, &mut acc);
        acc
    }

    /// Owned counterpart of [`Condition::conjuncts`].
    pub fn into_conjuncts(self) -> Vec<Condition> {
        fn walk(cond: Condition, acc: &mut Vec<Condition>) {
            match cond {
                Condition::Binary {
                    op: BinOp::And,
                    left,
                    right,
                } => {
                    walk(*left, acc);
                    walk(*right, acc);
                }
                other => acc.push(other),
            }
        }
        let mut acc = Vec::new();
        walk(self, &mut acc);
        acc
    }

    /// Left-nested conjunction `((c0 and c1) and c2) ...`; `None` when empty.
    pub fn conjunction(conds: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        conds
            .into_iter()
            .reduce(|acc, next| Condition::and(acc, next))
    }

    /// Collect every attribute reference in this condition into `acc`.
    pub fn attr_refs<'a>(&'a self, acc: &mut Vec<&'a AttrRef>) {
        match self {
            Condition::Attr(a) => acc.push(a),
            Condition::Literal(_) => {}
            Condition::Binary { left, right, .. } => {
                left.attr_refs(acc);
                right.attr_refs(acc);
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Attr(a) => write!(f, "{}", a),
            Condition::Literal(l) => write!(f, "{}", l),
            Condition::Binary { op, left, right } => match op {
                BinOp::Eq => write!(f, "{} = {}", left, right),
                BinOp::And => write!(f, "({}) and ({})", left, right),
            },
        }
    }
}

/// The closed set of plan operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    Scan,
    Select,
    Project,
    Rename,
    Cross,
    Join,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperatorKind::Scan => "scan",
            OperatorKind::Select => "select",
            OperatorKind::Project => "project",
            OperatorKind::Rename => "rename",
            OperatorKind::Cross => "cross",
            OperatorKind::Join => "join",
        };
        f.write_str(s)
    }
}

/// Relational-algebra expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaExpr {
    Scan {
        relation: String,
    },
    Select {
        condition: Condition,
        input: Box<RaExpr>,
    },
    Project {
        attributes: Vec<AttrRef>,
        input: Box<RaExpr>,
    },
    Rename {
        alias: String,
        input: Box<RaExpr>,
    },
    Cross {
        left: Box<RaExpr>,
        right: Box<RaExpr>,
    },
    Join {
        left: Box<RaExpr>,
        condition: Condition,
        right: Box<RaExpr>,
    },
}

/// A leaf of the tree as seen from above: the label its tuples flow under and
/// the base relation behind it (if the label hides a single base relation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSource {
    pub label: String,
    pub base: Option<String>,
}

impl RaExpr {
    pub fn scan(relation: impl Into<String>) -> Self {
        RaExpr::Scan {
            relation: relation.into(),
        }
    }

    pub fn select(condition: Condition, input: RaExpr) -> Self {
        RaExpr::Select {
            condition,
            input: Box::new(input),
        }
    }

    pub fn project(attributes: Vec<AttrRef>, input: RaExpr) -> Self {
        RaExpr::Project {
            attributes,
            input: Box::new(input),
        }
    }

    pub fn rename(alias: impl Into<String>, input: RaExpr) -> Self {
        RaExpr::Rename {
            alias: alias.into(),
            input: Box::new(input),
        }
    }

    pub fn cross(left: RaExpr, right: RaExpr) -> Self {
        RaExpr::Cross {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn join(left: RaExpr, condition: Condition, right: RaExpr) -> Self {
        RaExpr::Join {
            left: Box::new(left),
            condition,
            right: Box::new(right),
        }
    }

    pub fn kind(&self) -> OperatorKind {
        match self {
            RaExpr::Scan { .. } => OperatorKind::Scan,
            RaExpr::Select { .. } => OperatorKind::Select,
            RaExpr::Project { .. } => OperatorKind::Project,
            RaExpr::Rename { .. } => OperatorKind::Rename,
            RaExpr::Cross { .. } => OperatorKind::Cross,
            RaExpr::Join { .. } => OperatorKind::Join,
        }
    }

    /// Returns the number of inputs for this node.
    pub fn arity(&self) -> usize {
        match self {
            RaExpr::Scan { .. } => 0,
            RaExpr::Select { .. } | RaExpr::Project { .. } | RaExpr::Rename { .. } => 1,
            RaExpr::Cross { .. } | RaExpr::Join { .. } => 2,
        }
    }

    /// Returns true if this is a unary operator.
    pub fn is_unary(&self) -> bool {
        self.arity() == 1
    }

    /// Returns true if this is a binary operator.
    pub fn is_binary(&self) -> bool {
        self.arity() == 2
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            RaExpr::Scan { .. } => 1,
            RaExpr::Select { input, .. }
            | RaExpr::Project { input, .. }
            | RaExpr::Rename { input, .. } => 1 + input.node_count(),
            RaExpr::Cross { left, right } | RaExpr::Join { left, right, .. } => {
                1 + left.node_count() + right.node_count()
            }
        }
    }

    /// True if any `Cross` is left in the tree.
    pub fn contains_cross(&self) -> bool {
        match self {
            RaExpr::Scan { .. } => false,
            RaExpr::Select { input, .. }
            | RaExpr::Project { input, .. }
            | RaExpr::Rename { input, .. } => input.contains_cross(),
            RaExpr::Cross { .. } => true,
            RaExpr::Join { left, right, .. } => left.contains_cross() || right.contains_cross(),
        }
    }

    /// Label the tuples produced by this subtree flow under.
    ///
    /// Binary operators produce the union tag `"<left>,<right>"`.
    pub fn provenance(&self) -> String {
        match self {
            RaExpr::Scan { relation } => relation.clone(),
            RaExpr::Rename { alias, .. } => alias.clone(),
            RaExpr::Select { input, .. } | RaExpr::Project { input, .. } => input.provenance(),
            RaExpr::Cross { left, right } | RaExpr::Join { left, right, .. } => {
                format!("{},{}", left.provenance(), right.provenance())
            }
        }
    }

    /// Base relation hidden behind `Select`/`Project`/`Rename` wrappers, if the
    /// subtree reads exactly one relation.
    pub fn base_relation(&self) -> Option<&str> {
        match self {
            RaExpr::Scan { relation } => Some(relation),
            RaExpr::Select { input, .. }
            | RaExpr::Project { input, .. }
            | RaExpr::Rename { input, .. } => input.base_relation(),
            RaExpr::Cross { .. } | RaExpr::Join { .. } => None,
        }
    }

    /// Collect the leaf sources (Scan names and Rename aliases) of the
    /// subtree, left to right.
    pub fn leaf_sources(&self, acc: &mut Vec<LeafSource>) {
        match self {
            RaExpr::Scan { relation } => acc.push(LeafSource {
                label: relation.clone(),
                base: Some(relation.clone()),
            }),
            RaExpr::Rename { alias, input } => acc.push(LeafSource {
                label: alias.clone(),
                base: input.base_relation().map(str::to_string),
            }),
            RaExpr::Select { input, .. } | RaExpr::Project { input, .. } => {
                input.leaf_sources(acc)
            }
            RaExpr::Cross { left, right } | RaExpr::Join { left, right, .. } => {
                left.leaf_sources(acc);
                right.leaf_sources(acc);
            }
        }
    }

    /// Labels of every leaf source in the subtree.
    pub fn labels(&self) -> Vec<String> {
        let mut acc = Vec::new();
        self.leaf_sources(&mut acc);
        acc.into_iter().map(|s| s.label).collect()
    }
}

impl fmt::Display for RaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaExpr::Scan { relation } => write!(f, "{}", relation),
            RaExpr::Select { condition, input } => {
                write!(f, "\\select_{{{}}} ({})", condition, input)
            }
            RaExpr::Project { attributes, input } => {
                let attrs: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
                write!(f, "\\project_{{{}}} ({})", attrs.join(", "), input)
            }
            RaExpr::Rename { alias, input } => write!(f, "\\rename_{{{}: *}} ({})", alias, input),
            RaExpr::Cross { left, right } => write!(f, "({}) \\cross ({})", left, right),
            RaExpr::Join {
                left,
                condition,
                right,
            } => write!(f, "({}) \\join_{{{}}} ({})", left, condition, right),
        }
    }
}

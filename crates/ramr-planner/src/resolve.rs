//! Attribute → relation-label resolution used by selection push-down.
//!
//! Resolution never fails loudly: an attribute that cannot be pinned to a
//! single leaf of the subtree yields `Ambiguous` or `Unresolved`, and the
//! caller leaves the selection where it is.

use std::collections::BTreeSet;

use ramr_core::dictionary::DataDictionary;
use ramr_core::expr::{AttrRef, Condition, LeafSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every referenced attribute maps to exactly one leaf label.
    Resolved(BTreeSet<String>),
    /// Some attribute matches more than one relation or leaf.
    Ambiguous(AttrRef),
    /// Some attribute matches nothing in scope.
    Unresolved(AttrRef),
}

impl Resolution {
    pub fn labels(&self) -> Option<&BTreeSet<String>> {
        match self {
            Resolution::Resolved(labels) => Some(labels),
            _ => None,
        }
    }
}

/// Resolve one attribute against the leaves of a subtree.
///
/// Qualified references must name one of the leaf labels. Unqualified names
/// are looked up in the dictionary; the single owning relation must then sit
/// behind exactly one leaf (a scan of it, or an alias of such a scan).
pub fn resolve_attr(attr: &AttrRef, leaves: &[LeafSource], dd: &DataDictionary) -> Resolution {
    if let Some(rel) = &attr.relation {
        return if leaves.iter().any(|leaf| &leaf.label == rel) {
            Resolution::Resolved(BTreeSet::from([rel.clone()]))
        } else {
            Resolution::Unresolved(attr.clone())
        };
    }

    let owners = dd.relations_with(&attr.name);
    let owner = match owners.as_slice() {
        [] => return Resolution::Unresolved(attr.clone()),
        [only] => *only,
        _ => return Resolution::Ambiguous(attr.clone()),
    };

    let mut matching = leaves
        .iter()
        .filter(|leaf| leaf.base.as_deref() == Some(owner));
    match (matching.next(), matching.next()) {
        (Some(leaf), None) => Resolution::Resolved(BTreeSet::from([leaf.label.clone()])),
        (None, _) => Resolution::Unresolved(attr.clone()),
        (Some(_), Some(_)) => Resolution::Ambiguous(attr.clone()),
    }
}

/// Resolve every attribute of `cond`; the first failure wins.
pub fn resolve_condition(
    cond: &Condition,
    leaves: &[LeafSource],
    dd: &DataDictionary,
) -> Resolution {
    let mut refs = Vec::new();
    cond.attr_refs(&mut refs);

    let mut labels = BTreeSet::new();
    for attr in refs {
        match resolve_attr(attr, leaves, dd) {
            Resolution::Resolved(found) => labels.extend(found),
            failed => return failed,
        }
    }
    Resolution::Resolved(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramr_core::dictionary::AttrType;
    use ramr_core::expr::RaExpr;

    fn dd() -> DataDictionary {
        DataDictionary::new()
            .with_relation(
                "Person",
                [
                    ("name", AttrType::String),
                    ("age", AttrType::Integer),
                    ("gender", AttrType::String),
                ],
            )
            .with_relation("Eats", [("name", AttrType::String), ("pizza", AttrType::String)])
    }

    fn leaves(plan: &RaExpr) -> Vec<LeafSource> {
        let mut acc = Vec::new();
        plan.leaf_sources(&mut acc);
        acc
    }

    #[test]
    fn qualified_names_must_be_in_scope() {
        let scope = leaves(&RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")));
        assert_eq!(
            resolve_attr(&AttrRef::new("Eats", "pizza"), &scope, &dd()),
            Resolution::Resolved(BTreeSet::from(["Eats".to_string()]))
        );
        assert!(matches!(
            resolve_attr(&AttrRef::new("Serves", "pizza"), &scope, &dd()),
            Resolution::Unresolved(_)
        ));
    }

    #[test]
    fn bare_names_go_through_the_dictionary() {
        let scope = leaves(&RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")));
        assert_eq!(
            resolve_attr(&AttrRef::bare("age"), &scope, &dd()).labels(),
            Some(&BTreeSet::from(["Person".to_string()]))
        );
        assert!(matches!(
            resolve_attr(&AttrRef::bare("name"), &scope, &dd()),
            Resolution::Ambiguous(_)
        ));
        assert!(matches!(
            resolve_attr(&AttrRef::bare("price"), &scope, &dd()),
            Resolution::Unresolved(_)
        ));
    }

    #[test]
    fn bare_names_follow_aliases() {
        let scope = leaves(&RaExpr::cross(
            RaExpr::rename("X", RaExpr::scan("Person")),
            RaExpr::scan("Eats"),
        ));
        assert_eq!(
            resolve_attr(&AttrRef::bare("gender"), &scope, &dd()).labels(),
            Some(&BTreeSet::from(["X".to_string()]))
        );

        let self_cross = leaves(&RaExpr::cross(
            RaExpr::rename("X", RaExpr::scan("Person")),
            RaExpr::rename("Y", RaExpr::scan("Person")),
        ));
        assert!(matches!(
            resolve_attr(&AttrRef::bare("age"), &self_cross, &dd()),
            Resolution::Ambiguous(_)
        ));
    }

    #[test]
    fn condition_collects_all_labels() {
        let scope = leaves(&RaExpr::cross(RaExpr::scan("Person"), RaExpr::scan("Eats")));
        let cond = Condition::and(
            Condition::attr_eq(AttrRef::new("Person", "name"), AttrRef::new("Eats", "name")),
            Condition::eq(Condition::attr(AttrRef::bare("age")), Condition::int_lit(16)),
        );
        assert_eq!(
            resolve_condition(&cond, &scope, &dd()).labels().map(|l| l.len()),
            Some(2)
        );
    }
}

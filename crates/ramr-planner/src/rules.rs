//! Heuristic rewrite passes over the relational-algebra tree.
//!
//! `optimize` runs them in a fixed order:
//! 1. `break_up_selections`: one `Select` per atomic conjunct
//! 2. `push_down_selections`: move each `Select` below the `Cross` it sits on
//! 3. `merge_selections`: fold adjacent `Select`s back into one
//! 4. `introduce_joins`: `Select(a = b, Cross(l, r))` → `Join(l, a = b, r)`
//!
//! None of the passes can fail; whatever they cannot rewrite stays as is.

use std::collections::BTreeSet;

use ramr_core::dictionary::DataDictionary;
use ramr_core::expr::{Condition, LeafSource, RaExpr};
use tracing::{debug, trace};

use crate::resolve::{resolve_condition, Resolution};

/// Apply all four passes in order.
pub fn optimize(plan: RaExpr, dd: &DataDictionary) -> RaExpr {
    debug!(nodes = plan.node_count(), "optimizing plan");

    let plan = break_up_selections(plan);
    debug!(nodes = plan.node_count(), "after break_up_selections");

    let plan = push_down_selections(plan, dd);
    debug!(nodes = plan.node_count(), "after push_down_selections");

    let plan = merge_selections(plan);
    debug!(nodes = plan.node_count(), "after merge_selections");

    let plan = introduce_joins(plan);
    debug!(
        nodes = plan.node_count(),
        has_cross = plan.contains_cross(),
        "after introduce_joins"
    );
    plan
}

/// Rebuild `expr` with `f` applied to each direct child.
fn map_children(expr: RaExpr, mut f: impl FnMut(RaExpr) -> RaExpr) -> RaExpr {
    use RaExpr::*;

    match expr {
        Scan { .. } => expr,
        Select { condition, input } => Select {
            condition,
            input: Box::new(f(*input)),
        },
        Project { attributes, input } => Project {
            attributes,
            input: Box::new(f(*input)),
        },
        Rename { alias, input } => Rename {
            alias,
            input: Box::new(f(*input)),
        },
        Cross { left, right } => Cross {
            left: Box::new(f(*left)),
            right: Box::new(f(*right)),
        },
        Join {
            left,
            condition,
            right,
        } => Join {
            left: Box::new(f(*left)),
            condition,
            right: Box::new(f(*right)),
        },
    }
}

/// Split a maximal run of `Select`s into its conditions (outermost first) and
/// the first non-`Select` node below it.
fn split_select_chain(expr: RaExpr) -> (Vec<Condition>, RaExpr) {
    let mut conds = Vec::new();
    let mut cur = expr;
    loop {
        match cur {
            RaExpr::Select { condition, input } => {
                conds.push(condition);
                cur = *input;
            }
            terminal => return (conds, terminal),
        }
    }
}

/// Wrap `input` in one `Select` per condition, first condition outermost.
fn stack_selects(conds: Vec<Condition>, input: RaExpr) -> RaExpr {
    conds
        .into_iter()
        .rev()
        .fold(input, |acc, cond| RaExpr::select(cond, acc))
}

/// Replace every `Select` over an `and` chain with a stack of atomic
/// `Select`s; the last conjunct ends up closest to the input.
pub fn break_up_selections(expr: RaExpr) -> RaExpr {
    match expr {
        RaExpr::Select { condition, input } => {
            let input = break_up_selections(*input);
            stack_selects(condition.into_conjuncts(), input)
        }
        other => map_children(other, break_up_selections),
    }
}

/// Move selections sitting on a `Cross` down to the deepest child that
/// produces every attribute they reference.
///
/// Selections whose attributes cannot be resolved (unknown or owned by more
/// than one relation) stay directly above the `Cross`.
pub fn push_down_selections(expr: RaExpr, dd: &DataDictionary) -> RaExpr {
    match expr {
        RaExpr::Select { .. } => {
            let (conds, terminal) = split_select_chain(expr);
            if !matches!(terminal, RaExpr::Cross { .. }) {
                return stack_selects(conds, push_down_selections(terminal, dd));
            }

            let mut leaves = Vec::new();
            terminal.leaf_sources(&mut leaves);

            let mut node = push_down_selections(terminal, dd);
            for cond in conds {
                node = place_condition(node, cond, &leaves, dd);
            }
            node
        }
        other => map_children(other, |child| push_down_selections(child, dd)),
    }
}

fn place_condition(
    node: RaExpr,
    cond: Condition,
    leaves: &[LeafSource],
    dd: &DataDictionary,
) -> RaExpr {
    match resolve_condition(&cond, leaves, dd) {
        Resolution::Resolved(labels) => {
            trace!(condition = %cond, ?labels, "pushing selection");
            insert_select(node, cond, &labels)
        }
        Resolution::Ambiguous(attr) => {
            debug!(condition = %cond, attribute = %attr, "ambiguous attribute; selection stays");
            RaExpr::select(cond, node)
        }
        Resolution::Unresolved(attr) => {
            debug!(condition = %cond, attribute = %attr, "unresolved attribute; selection stays");
            RaExpr::select(cond, node)
        }
    }
}

fn covers(child: &RaExpr, labels: &BTreeSet<String>) -> bool {
    let have: BTreeSet<String> = child.labels().into_iter().collect();
    labels.is_subset(&have)
}

/// Insert `Select(cond)` as deep as possible below `node`.
fn insert_select(node: RaExpr, cond: Condition, labels: &BTreeSet<String>) -> RaExpr {
    match node {
        RaExpr::Cross { left, right } => {
            if covers(&left, labels) {
                RaExpr::Cross {
                    left: Box::new(insert_select(*left, cond, labels)),
                    right,
                }
            } else if covers(&right, labels) {
                RaExpr::Cross {
                    left,
                    right: Box::new(insert_select(*right, cond, labels)),
                }
            } else {
                RaExpr::select(cond, RaExpr::Cross { left, right })
            }
        }
        RaExpr::Select { condition, input } => RaExpr::Select {
            condition,
            input: Box::new(insert_select(*input, cond, labels)),
        },
        other => RaExpr::select(cond, other),
    }
}

/// Collapse every chain of adjacent `Select`s into one `Select` over the
/// left-nested conjunction of their conditions, outermost first.
pub fn merge_selections(expr: RaExpr) -> RaExpr {
    match expr {
        RaExpr::Select { .. } => {
            let (conds, terminal) = split_select_chain(expr);
            let input = merge_selections(terminal);
            match Condition::conjunction(conds) {
                Some(cond) => RaExpr::select(cond, input),
                None => input,
            }
        }
        other => map_children(other, merge_selections),
    }
}

/// True when every conjunct of `cond` is `a = b` with `a` owned by one side
/// and `b` by the other.
fn is_equi_join(cond: &Condition, left: &RaExpr, right: &RaExpr) -> bool {
    let left_labels: BTreeSet<String> = left.labels().into_iter().collect();
    let right_labels: BTreeSet<String> = right.labels().into_iter().collect();

    cond.conjuncts().into_iter().all(|atom| {
        let Some((a, b)) = atom.as_attr_equality() else {
            return false;
        };
        let (Some(ra), Some(rb)) = (&a.relation, &b.relation) else {
            return false;
        };
        (left_labels.contains(ra) && right_labels.contains(rb))
            || (right_labels.contains(ra) && left_labels.contains(rb))
    })
}

/// Turn `Select`-over-`Cross` equi-join patterns into `Join`s, bottom-up.
///
/// An equi-join `Select` directly above an existing `Join` is folded into
/// that join's condition.
pub fn introduce_joins(expr: RaExpr) -> RaExpr {
    match expr {
        RaExpr::Select { condition, input } => match introduce_joins(*input) {
            RaExpr::Cross { left, right } if is_equi_join(&condition, &left, &right) => {
                debug!(condition = %condition, "introducing join");
                RaExpr::Join {
                    left,
                    condition,
                    right,
                }
            }
            RaExpr::Join {
                left,
                condition: existing,
                right,
            } if is_equi_join(&condition, &left, &right) => {
                debug!(condition = %condition, "extending join condition");
                RaExpr::Join {
                    left,
                    condition: Condition::and(existing, condition),
                    right,
                }
            }
            input => RaExpr::select(condition, input),
        },
        other => map_children(other, introduce_joins),
    }
}

#![allow(dead_code)]

use sluice::Value;
use sluice::ir::{Expr, LogicalPlan, NodeRef, Operator, Selection};
use sluice_test_utils::{Database, Row, apply_filter, assert_same_rows, execute};

pub fn row(values: &[Option<i64>]) -> Row {
    values
        .iter()
        .map(|v| v.map(Value::int64).unwrap_or(Value::Null))
        .collect()
}

/// Puts `predicates` in a Selection on top of the plan's root and returns the
/// rows the unoptimized plan accepts.
pub fn filter_root(plan: &mut LogicalPlan, predicates: Vec<Expr>, db: &Database) -> Vec<Row> {
    let root = plan.root().unwrap();
    let schema = plan.schema(root).clone();
    let expected = apply_filter(execute(plan, db).unwrap(), &schema, &predicates).unwrap();
    let selection = plan.add_node(
        Operator::Selection(Selection {
            conditions: predicates,
        }),
        schema,
        vec![root],
    );
    plan.set_root(selection);
    expected
}

/// Optimizes `plan` with `predicates` on top and checks it accepts the same
/// rows as the original plan filtered by them.
pub fn assert_sound(plan: &mut LogicalPlan, predicates: Vec<Expr>, db: &Database) {
    let expected = filter_root(plan, predicates, db);
    sluice::optimize(plan).unwrap();
    plan.check_links().unwrap();
    assert_same_rows(execute(plan, db).unwrap(), expected);
}

pub fn selection_conditions(plan: &LogicalPlan, node: NodeRef) -> Vec<Expr> {
    match plan.op(node) {
        Operator::Selection(s) => s.conditions.clone(),
        other => panic!("Expected Selection, got {}", other.name()),
    }
}

pub fn is_reachable(plan: &LogicalPlan, node: NodeRef) -> bool {
    plan.walk().contains(&node)
}

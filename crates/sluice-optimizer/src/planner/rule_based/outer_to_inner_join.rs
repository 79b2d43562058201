use sluice_common::error::{Error, Result};
use sluice_ir::{Expr, JoinType, LogicalPlan, NodeRef, PlanSchema};
use tracing::debug;

use crate::planner::null_rejection::is_null_rejected;

/// Downgrades LEFT/RIGHT outer joins under `join` to INNER where the
/// `predicates` filtering the join's output reject the null-extended rows of
/// the inner side.
///
/// Nested joins are visited with the conditions that constrain their output:
/// an inner-side child sees this join's ON conditions plus `predicates`; an
/// outer-side child sees `predicates`, plus the ON conditions once this join
/// has become INNER. Join nesting deeper than `max_depth` below `join` is an
/// [`Error::InvalidPlan`].
pub fn simplify_outer_joins(
    plan: &mut LogicalPlan,
    join: NodeRef,
    predicates: &[Expr],
    max_depth: usize,
) -> Result<()> {
    simplify(plan, join, predicates, 0, max_depth)
}

fn simplify(
    plan: &mut LogicalPlan,
    join: NodeRef,
    predicates: &[Expr],
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    if depth > max_depth {
        return Err(Error::invalid_plan(format!("join nesting exceeds {} levels", max_depth)));
    }
    let Some(payload) = plan.op(join).as_join() else {
        return Err(Error::internal(format!(
            "outer join simplification reached {}",
            plan.op(join).name()
        )));
    };
    let join_type = payload.join_type;
    let mut conditions = payload.all_conditions();
    conditions.extend(predicates.iter().cloned());

    let left = plan.child(join, 0)?;
    let right = plan.child(join, 1)?;
    let next = depth + 1;

    match join_type {
        JoinType::Inner => {
            for child in [left, right] {
                if plan.op(child).is_join() {
                    simplify(plan, child, &conditions, next, max_depth)?;
                }
            }
            Ok(())
        }
        JoinType::Semi | JoinType::SemiWithAux => Ok(()),
        JoinType::LeftOuter | JoinType::RightOuter => {
            let (inner, outer) = if join_type == JoinType::LeftOuter {
                (right, left)
            } else {
                (left, right)
            };

            if plan.op(inner).is_join() {
                simplify(plan, inner, &conditions, next, max_depth)?;
            }

            if rejects_null_extension(plan.schema(inner), predicates)? {
                if let Some(j) = plan.op_mut(join).as_join_mut() {
                    j.join_type = JoinType::Inner;
                }
                debug!(
                    join = %plan.node(join).id,
                    from = %join_type,
                    "outer join converted to inner join"
                );
                if plan.op(outer).is_join() {
                    simplify(plan, outer, &conditions, next, max_depth)?;
                }
            } else if plan.op(outer).is_join() {
                simplify(plan, outer, predicates, next, max_depth)?;
            }
            Ok(())
        }
    }
}

fn rejects_null_extension(inner: &PlanSchema, predicates: &[Expr]) -> Result<bool> {
    for p in predicates {
        if is_null_rejected(inner, p)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use sluice_common::types::Value;
    use sluice_test_utils::{PlanBuilder, lit, lit_str};

    use super::*;

    const DEPTH: usize = 64;

    fn join_type(plan: &LogicalPlan, node: NodeRef) -> JoinType {
        match plan.op(node).as_join() {
            Some(j) => j.join_type,
            None => panic!("Expected Join"),
        }
    }

    #[test]
    fn converts_left_join_with_equality_on_inner_side() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id", "x"]);
        let on = vec![Expr::eq(b.col(a, "a.id"), b.col(t, "b.id"))];
        let j = b.join_on(a, t, JoinType::LeftOuter, on);
        let pred = Expr::eq(b.col(t, "x"), lit(5));
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[pred], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::Inner);
    }

    #[test]
    fn preserves_left_join_with_is_null_disjunct() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id", "x"]);
        let j = b.join(a, t, JoinType::LeftOuter);
        let x = b.col(t, "x");
        let pred = Expr::or(Expr::eq(x.clone(), lit(5)), Expr::is_null(x));
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[pred], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::LeftOuter);
    }

    #[test]
    fn preserves_left_join_with_predicate_on_outer_side_only() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id"]);
        let j = b.join(a, t, JoinType::LeftOuter);
        let pred = Expr::gt(b.col(a, "a.id"), lit(1));
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[pred], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::LeftOuter);
    }

    #[test]
    fn converts_right_join_with_comparison_on_left() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id"]);
        let j = b.join(a, t, JoinType::RightOuter);
        let pred = Expr::gt(b.col(a, "a.id"), lit(1));
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[pred], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::Inner);
    }

    #[test]
    fn false_constant_downgrades() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id"]);
        let j = b.join(a, t, JoinType::LeftOuter);
        let mut plan = b.finish(j);

        let always_false = Expr::literal(Value::bool_val(false));
        simplify_outer_joins(&mut plan, j, &[always_false], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::Inner);
    }

    #[test]
    fn nested_inner_side_join_sees_on_conditions() {
        // a LEFT JOIN (b LEFT JOIN c ON ..) ON a.id = c.id: the ON condition
        // of the outer join rejects nulls from c inside the inner side.
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let bt = b.scan("b", &["id"]);
        let c = b.scan("c", &["id"]);
        let bc_on = vec![Expr::eq(b.col(bt, "b.id"), b.col(c, "c.id"))];
        let bc = b.join_on(bt, c, JoinType::LeftOuter, bc_on);
        let on = vec![Expr::eq(b.col(a, "a.id"), b.col(c, "c.id"))];
        let j = b.join_on(a, bc, JoinType::LeftOuter, on);
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[], DEPTH).unwrap();
        assert_eq!(join_type(&plan, bc), JoinType::Inner);
        assert_eq!(join_type(&plan, j), JoinType::LeftOuter);
    }

    #[test]
    fn outer_side_join_downgraded_only_after_parent() {
        // (a LEFT JOIN b) LEFT JOIN c, WHERE c.id = b.id
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let bt = b.scan("b", &["id"]);
        let c = b.scan("c", &["id"]);
        let ab = b.join(a, bt, JoinType::LeftOuter);
        let j = b.join(ab, c, JoinType::LeftOuter);
        let pred = Expr::eq(b.col(c, "c.id"), b.col(bt, "b.id"));
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[pred], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::Inner);
        assert_eq!(join_type(&plan, ab), JoinType::Inner);
    }

    #[test]
    fn inner_join_passes_conditions_down() {
        // (a LEFT JOIN b) INNER JOIN c ON b.id = c.id
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let bt = b.scan("b", &["id"]);
        let c = b.scan("c", &["id"]);
        let ab = b.join(a, bt, JoinType::LeftOuter);
        let on = vec![Expr::eq(b.col(bt, "b.id"), b.col(c, "c.id"))];
        let j = b.join_on(ab, c, JoinType::Inner, on);
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[], DEPTH).unwrap();
        assert_eq!(join_type(&plan, ab), JoinType::Inner);
    }

    #[test]
    fn semi_join_is_untouched() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id"]);
        let j = b.join(a, t, JoinType::Semi);
        let pred = Expr::gt(b.col(a, "a.id"), lit(1));
        let mut plan = b.finish(j);

        simplify_outer_joins(&mut plan, j, &[pred], DEPTH).unwrap();
        assert_eq!(join_type(&plan, j), JoinType::Semi);
    }

    #[test]
    fn coercion_failure_propagates() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let t = b.scan("b", &["id"]);
        let j = b.join(a, t, JoinType::LeftOuter);
        let mut plan = b.finish(j);

        let err = simplify_outer_joins(&mut plan, j, &[lit_str("abc")], DEPTH).unwrap_err();
        assert!(matches!(err, Error::InvalidLiteral(_)));
    }

    #[test]
    fn non_join_node_is_internal_error() {
        let mut b = PlanBuilder::new();
        let a = b.scan("a", &["id"]);
        let mut plan = b.finish(a);
        assert!(matches!(
            simplify_outer_joins(&mut plan, a, &[], DEPTH),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn deep_join_chain_is_invalid_plan() {
        let mut b = PlanBuilder::new();
        let mut node = b.dual(1);
        for _ in 0..10 {
            let right = b.dual(1);
            node = b.join(node, right, JoinType::LeftOuter);
        }
        let mut plan = b.finish(node);

        let err = simplify_outer_joins(&mut plan, node, &[], 4).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));
        simplify_outer_joins(&mut plan, node, &[], 16).unwrap();
    }
}

use sluice_common::error::{Error, Result};
use sluice_ir::{Expr, LogicalPlan, NodeRef, Operator, PlanSchema};

use super::{PredicatePushDown, PushDownResult};
use crate::planner::predicate::{extract_columns, substitute_columns};

/// A predicate can move below a projection when every column it reads is
/// produced by a plain column reference or a constant, never by a computed
/// expression.
fn is_substitutable(predicate: &Expr, schema: &PlanSchema, exprs: &[Expr]) -> bool {
    extract_columns(predicate).iter().all(|c| {
        schema
            .index_of(c)
            .and_then(|i| exprs.get(i))
            .is_some_and(|e| !matches!(e, Expr::ScalarFunction(_)))
    })
}

impl PredicatePushDown {
    pub(super) fn push_projection(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let child = plan.child(node, 0)?;
        let exprs = match plan.op(node) {
            Operator::Projection(p) => p.exprs.clone(),
            other => {
                return Err(Error::internal(format!(
                    "expected Projection, got {}",
                    other.name()
                )));
            }
        };
        let schema = plan.schema(node).clone();

        let mut push = Vec::new();
        let mut ret = Vec::new();
        for predicate in predicates {
            if is_substitutable(&predicate, &schema, &exprs) {
                push.push(substitute_columns(&predicate, &schema, &exprs)?);
            } else {
                ret.push(predicate);
            }
        }

        let (rest, _) = self.push_down_at(plan, child, push, depth + 1)?;
        self.wrap_child(plan, node, 0, rest)?;
        Ok((ret, node))
    }

    pub(super) fn push_union(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let schema = plan.schema(node).clone();
        for index in 0..plan.children(node).len() {
            let branch = plan.child(node, index)?;
            let replacements = plan.schema(branch).to_exprs();
            if replacements.len() != schema.len() {
                return Err(Error::invalid_plan(format!(
                    "union branch {} has {} columns, union has {}",
                    index,
                    replacements.len(),
                    schema.len()
                )));
            }
            let branch_predicates = predicates
                .iter()
                .map(|p| substitute_columns(p, &schema, &replacements))
                .collect::<Result<Vec<_>>>()?;
            let (rest, _) = self.push_down_at(plan, branch, branch_predicates, depth + 1)?;
            self.wrap_child(plan, node, index, rest)?;
        }
        Ok((Vec::new(), node))
    }
}

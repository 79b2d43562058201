use sluice_common::error::{Error, Result};
use sluice_ir::{Expr, JoinType, LogicalPlan, NodeRef};
use tracing::debug;

use super::{PredicatePushDown, PushDownResult};
use crate::join_order::reorder_join_group;
use crate::planner::predicate::{extract_on_condition, is_covered_by};
use crate::planner::rule_based::simplify_outer_joins;

impl PredicatePushDown {
    pub(super) fn push_join(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let budget = self.settings.max_plan_depth.saturating_sub(depth);
        if self.settings.outer_join_simplification {
            simplify_outer_joins(plan, node, &predicates, budget)?;
        }
        if self.settings.join_reorder
            && let Some(new_root) =
                reorder_join_group(plan, node, &predicates, self.solver.as_ref(), budget)?
        {
            debug!(join = %plan.node(new_root).id, "restarting push-down on reordered join group");
            return self.push_down_at(plan, new_root, predicates, depth);
        }

        let left = plan.child(node, 0)?;
        let right = plan.child(node, 1)?;
        let inputs = plan.schema(left).clone().merge(plan.schema(right).clone());
        let (predicates, foreign): (Vec<Expr>, Vec<Expr>) = predicates
            .into_iter()
            .partition(|p| is_covered_by(p, &inputs));
        let on = extract_on_condition(predicates, plan.schema(left), plan.schema(right));

        let join = plan
            .op_mut(node)
            .as_join_mut()
            .ok_or_else(|| Error::internal("join push-down reached a non-join node"))?;
        let join_type = join.join_type;
        let (left_push, right_push, mut ret) = match join_type {
            JoinType::LeftOuter | JoinType::Semi | JoinType::SemiWithAux => {
                let right_push = std::mem::take(&mut join.right_conditions);
                let mut ret = on.equal;
                ret.extend(on.other);
                ret.extend(on.right);
                (on.left, right_push, ret)
            }
            JoinType::RightOuter => {
                let left_push = std::mem::take(&mut join.left_conditions);
                let mut ret = on.equal;
                ret.extend(on.other);
                ret.extend(on.left);
                (left_push, on.right, ret)
            }
            JoinType::Inner => {
                let mut left_push = std::mem::take(&mut join.left_conditions);
                left_push.extend(on.left);
                let mut right_push = std::mem::take(&mut join.right_conditions);
                right_push.extend(on.right);
                join.equal_conditions.extend(on.equal);
                join.other_conditions.extend(on.other);
                (left_push, right_push, Vec::new())
            }
        };

        // Columns neither input produces, such as a semi join's auxiliary
        // column, can only be filtered above the join.
        ret.extend(foreign);

        let (left_rest, _) = self.push_down_at(plan, left, left_push, depth + 1)?;
        self.wrap_child(plan, node, 0, left_rest)?;
        let (right_rest, _) = self.push_down_at(plan, right, right_push, depth + 1)?;
        self.wrap_child(plan, node, 1, right_rest)?;

        Ok((ret, node))
    }
}

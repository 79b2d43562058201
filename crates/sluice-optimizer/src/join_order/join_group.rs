use sluice_common::error::{Error, Result};
use sluice_ir::{Expr, JoinType, LogicalPlan, NodeRef};
use tracing::debug;

use super::JoinReorderSolver;

#[derive(Debug, Clone)]
pub struct JoinGroup {
    pub root: NodeRef,
    /// Joins of the group, root first.
    pub joins: Vec<NodeRef>,
    /// Inputs of the group, left to right.
    pub relations: Vec<NodeRef>,
    /// ON conditions of every join in the group.
    pub conditions: Vec<Expr>,
}

fn is_groupable(plan: &LogicalPlan, node: NodeRef) -> bool {
    matches!(
        plan.op(node).as_join(),
        Some(j) if j.join_type == JoinType::Inner && !j.reordered
    )
}

fn flatten(
    plan: &LogicalPlan,
    node: NodeRef,
    group: &mut JoinGroup,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    if !is_groupable(plan, node) {
        group.relations.push(node);
        return Ok(());
    }
    if depth > max_depth {
        return Err(Error::invalid_plan(format!("join group nesting exceeds {} levels", max_depth)));
    }
    group.joins.push(node);
    if let Some(j) = plan.op(node).as_join() {
        group.conditions.extend(j.all_conditions());
    }
    for child in plan.children(node) {
        flatten(plan, *child, group, depth + 1, max_depth)?;
    }
    Ok(())
}

/// The join group rooted at `join`, if it spans at least two joins. Groups
/// nested deeper than `max_depth` are an [`Error::InvalidPlan`].
pub fn try_get_join_group(
    plan: &LogicalPlan,
    join: NodeRef,
    max_depth: usize,
) -> Result<Option<JoinGroup>> {
    if !is_groupable(plan, join) {
        return Ok(None);
    }
    let mut group = JoinGroup {
        root: join,
        joins: Vec::new(),
        relations: Vec::new(),
        conditions: Vec::new(),
    };
    flatten(plan, join, &mut group, 0, max_depth)?;
    Ok((group.joins.len() >= 2).then_some(group))
}

/// Replaces the join group rooted at `join` with the tree `solver` builds.
/// Returns the new root, or `None` when `join` does not root a group.
pub fn reorder_join_group(
    plan: &mut LogicalPlan,
    join: NodeRef,
    predicates: &[Expr],
    solver: &dyn JoinReorderSolver,
    max_depth: usize,
) -> Result<Option<NodeRef>> {
    let Some(group) = try_get_join_group(plan, join, max_depth)? else {
        return Ok(None);
    };
    let new_root = solver.reorder(plan, &group, predicates)?;
    plan.replace_subtree(join, new_root)?;
    debug!(
        old_root = %plan.node(join).id,
        new_root = %plan.node(new_root).id,
        relations = group.relations.len(),
        "join group reordered"
    );
    Ok(Some(new_root))
}

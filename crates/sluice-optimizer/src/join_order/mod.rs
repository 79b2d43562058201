//! Join-group detection and reordering.
//!
//! A join group is a maximal tree of directly connected, not yet reordered
//! INNER joins. When one with at least two joins is found, a
//! [`JoinReorderSolver`] builds a replacement tree, which is spliced in
//! place of the group root.

mod cost_model;
mod greedy;
mod join_graph;
mod join_group;

pub use cost_model::{CostModel, JoinCost};
pub use greedy::GreedyJoinReorderer;
pub use join_graph::{JoinEdge, JoinGraph, JoinRelation, RelationId};
pub use join_group::{JoinGroup, reorder_join_group, try_get_join_group};
use sluice_common::error::Result;
use sluice_ir::{Expr, LogicalPlan, NodeRef};

pub trait JoinReorderSolver: Send + Sync {
    /// Builds a join tree over `group.relations` from new nodes of `plan`
    /// and returns its root. Every join it creates must be marked
    /// `reordered`, and the root must output the same columns as
    /// `group.root`. The caller splices the result into the tree.
    fn reorder(&self, plan: &mut LogicalPlan, group: &JoinGroup, predicates: &[Expr])
    -> Result<NodeRef>;
}

//! Predicate push-down for logical query plans.
//!
//! The pass moves filter predicates as close to the data sources as the
//! semantics of each operator allow. Along the way it converts outer joins
//! whose null-extended rows are filtered out into inner joins, and hands
//! chains of inner joins to a join-order solver.

mod join_order;
mod pass;
mod planner;

pub use join_order::{
    CostModel, GreedyJoinReorderer, JoinCost, JoinEdge, JoinGraph, JoinGroup, JoinRelation,
    JoinReorderSolver, RelationId, reorder_join_group, try_get_join_group,
};
pub use pass::OptimizationPass;
pub use planner::null_rejection::{evaluate_with_nulls, is_null_rejected};
pub use planner::predicate::{
    OnConditions, extract_columns, extract_on_condition, split_conjunction, substitute_columns,
};
pub use planner::predicate_pushdown::{PredicatePushDown, PushDownResult};
pub use planner::rule_based::simplify_outer_joins;
use serde::{Deserialize, Serialize};
use sluice_common::error::Result;
use sluice_ir::LogicalPlan;
use tracing::{debug, instrument};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub predicate_pushdown: bool,
    pub outer_join_simplification: bool,
    pub join_reorder: bool,
    /// Deepest plan the pass will recurse into before giving up with
    /// `Error::InvalidPlan`.
    pub max_plan_depth: usize,
}

const DEFAULT_MAX_PLAN_DEPTH: usize = 512;

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl OptimizerSettings {
    pub fn all_enabled() -> Self {
        Self {
            predicate_pushdown: true,
            outer_join_simplification: true,
            join_reorder: true,
            max_plan_depth: DEFAULT_MAX_PLAN_DEPTH,
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            predicate_pushdown: false,
            outer_join_simplification: false,
            join_reorder: false,
            max_plan_depth: DEFAULT_MAX_PLAN_DEPTH,
        }
    }
}

pub fn optimize(plan: &mut LogicalPlan) -> Result<()> {
    optimize_with_settings(plan, &OptimizerSettings::all_enabled())
}

pub fn optimize_with_settings(plan: &mut LogicalPlan, settings: &OptimizerSettings) -> Result<()> {
    optimize_with_solver(plan, settings, Box::new(GreedyJoinReorderer::default()))
}

/// Like [`optimize_with_settings`], with a caller-supplied join-order solver.
#[instrument(skip_all)]
pub fn optimize_with_solver(
    plan: &mut LogicalPlan,
    settings: &OptimizerSettings,
    solver: Box<dyn JoinReorderSolver>,
) -> Result<()> {
    if !settings.predicate_pushdown {
        debug!("predicate push-down disabled");
        return Ok(());
    }
    PredicatePushDown::with_solver(settings.clone(), solver).apply_logical(plan)
}

//! Sluice - predicate push-down for logical query plans.
//!
//! Sluice takes a logical plan built by a SQL planner and moves filter
//! predicates as close to the data sources as each operator allows. While
//! doing so it converts outer joins whose null-extended rows would be
//! rejected anyway into inner joins, and hands chains of inner joins to a
//! join-order solver.
//!
//! # Architecture
//!
//! ```text
//! LogicalPlan → optimize() → LogicalPlan (predicates pushed, joins simplified)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice::{LogicalPlan, optimize};
//!
//! let mut plan: LogicalPlan = planner.plan(&query)?;
//! optimize(&mut plan)?;
//! println!("{}", plan);
//! ```

pub use sluice_common::error::{Error, Result};
pub use sluice_common::types::{DataType, Value};
pub use sluice_functions::{evaluate, is_control_function, new_function};
pub use sluice_ir::{
    Column, Constant, Expr, IdAllocator, Join, JoinType, LogicalPlan, NodeRef, Operator, PlanId,
    PlanNode, PlanSchema, ScalarFunction, ScalarFunctionExpr,
};
pub use sluice_optimizer::{
    CostModel, GreedyJoinReorderer, JoinGroup, JoinReorderSolver, OptimizationPass,
    OptimizerSettings, PredicatePushDown, PushDownResult, evaluate_with_nulls,
    extract_on_condition, is_null_rejected, optimize, optimize_with_settings, optimize_with_solver,
    simplify_outer_joins, split_conjunction, substitute_columns,
};
use tracing::debug;

/// Re-export of the plan IR crate for callers that build plans directly.
pub mod ir {
    pub use sluice_ir::*;
}

/// Parses `OptimizerSettings` from a TOML document.
///
/// Keys that are absent keep their defaults, so an empty document yields
/// [`OptimizerSettings::all_enabled`].
pub fn settings_from_toml(source: &str) -> Result<OptimizerSettings> {
    let settings: OptimizerSettings = toml::from_str(source)
        .map_err(|e| Error::invalid_literal(format!("optimizer settings: {}", e.message())))?;
    debug!(?settings, "loaded optimizer settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_document_uses_defaults() {
        let settings = settings_from_toml("").unwrap();
        assert_eq!(settings, OptimizerSettings::all_enabled());
    }

    #[test]
    fn settings_document_overrides_keys() {
        let settings = settings_from_toml("join_reorder = false\nmax_plan_depth = 16\n").unwrap();
        assert!(settings.predicate_pushdown);
        assert!(!settings.join_reorder);
        assert_eq!(settings.max_plan_depth, 16);
    }

    #[test]
    fn malformed_settings_document_is_invalid_literal() {
        let err = settings_from_toml("join_reorder = \"sometimes\"").unwrap_err();
        assert!(matches!(err, Error::InvalidLiteral(_)));
    }
}

//! Logical plans and expressions consumed by the Sluice optimizer.
//!
//! Plans live in an arena ([`LogicalPlan`]); nodes refer to their children and
//! to their parent through [`NodeRef`] handles, so back-links never own
//! anything and tree surgery is a matter of rewriting handles.

mod expr;
mod id;
mod plan;
mod schema;

pub use expr::{Column, Constant, Expr, ScalarFunction, ScalarFunctionExpr};
pub use id::{IdAllocator, PlanId};
pub use plan::{
    AggregateCall, AggregateFunction, Aggregation, Apply, DataSource, Delete, Insert, Join,
    JoinType, Limit, LockType, LogicalPlan, NodeRef, Operator, PlanNode, Projection, Selection,
    SelectLock, Sort, SortItem, TableDual, Union, Update,
};
pub use schema::PlanSchema;

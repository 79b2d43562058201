//! Predicate push-down.
//!
//! [`PredicatePushDown::push_down`] hands a node the predicates that filter
//! its output and returns the ones it could not place below itself, plus
//! the node now standing where it stood (a Selection may remove itself, a
//! join group may be replaced). Callers materialise non-empty residuals as
//! a Selection above the returned node.

mod join;
mod projection;

use sluice_common::error::{Error, Result};
use sluice_ir::{Expr, LogicalPlan, NodeRef, Operator, PlanSchema, Selection};
use tracing::{debug, instrument};

use super::predicate::{extract_columns, is_covered_by, split_conjunction};
use crate::OptimizerSettings;
use crate::join_order::{GreedyJoinReorderer, JoinReorderSolver};
use crate::pass::OptimizationPass;

pub type PushDownResult = (Vec<Expr>, NodeRef);

pub struct PredicatePushDown {
    settings: OptimizerSettings,
    solver: Box<dyn JoinReorderSolver>,
}

impl PredicatePushDown {
    pub fn new(settings: OptimizerSettings) -> Self {
        Self::with_solver(settings, Box::new(GreedyJoinReorderer::default()))
    }

    pub fn with_solver(settings: OptimizerSettings, solver: Box<dyn JoinReorderSolver>) -> Self {
        Self { settings, solver }
    }

    pub fn push_down(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
    ) -> Result<PushDownResult> {
        self.push_down_at(plan, node, predicates, 0)
    }

    fn push_down_at(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        if depth > self.settings.max_plan_depth {
            return Err(Error::invalid_plan(format!(
                "plan nesting exceeds {} levels",
                self.settings.max_plan_depth
            )));
        }
        match plan.op(node) {
            Operator::Selection(_) => self.push_selection(plan, node, predicates, depth),
            Operator::DataSource(_) | Operator::TableDual(_) => Ok((predicates, node)),
            Operator::Join(_) => self.push_join(plan, node, predicates, depth),
            Operator::Projection(_) => self.push_projection(plan, node, predicates, depth),
            Operator::Union(_) => self.push_union(plan, node, predicates, depth),
            Operator::Aggregation(_) => self.push_aggregation(plan, node, predicates, depth),
            Operator::Apply(_) => self.push_apply(plan, node, predicates, depth),
            Operator::Limit(_) => self.push_limit(plan, node, predicates, depth),
            Operator::Sort(_)
            | Operator::Trim
            | Operator::MaxOneRow
            | Operator::Exists
            | Operator::Distinct
            | Operator::Insert(_)
            | Operator::SelectLock(_)
            | Operator::Update(_)
            | Operator::Delete(_) => {
                let rest = self.push_to_only_child(plan, node, predicates, depth)?;
                Ok((rest, node))
            }
        }
    }

    /// Default behaviour of single-input operators: predicates over the
    /// child's columns go to the child, and whatever the child rejects comes
    /// back together with predicates on columns the node itself produces. A
    /// node without children hands all predicates back.
    fn push_to_only_child(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<Vec<Expr>> {
        match plan.children(node).to_vec().as_slice() {
            [] => Ok(predicates),
            [child] => {
                // Exists maps an empty input to a row, so column-free
                // predicates stay above it.
                let keeps_constants = matches!(plan.op(node), Operator::Exists);
                let (push, mut ret): (Vec<Expr>, Vec<Expr>) =
                    predicates.into_iter().partition(|p| {
                        is_covered_by(p, plan.schema(*child))
                            && !(keeps_constants && extract_columns(p).is_empty())
                    });
                let (rest, _) = self.push_down_at(plan, *child, push, depth + 1)?;
                ret.extend(rest);
                Ok(ret)
            }
            children => Err(Error::invalid_plan(format!(
                "{} #{} has {} children, expected one",
                plan.op(node).name(),
                plan.node(node).id,
                children.len()
            ))),
        }
    }

    fn push_selection(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let child = plan.child(node, 0)?;
        let own = match plan.op_mut(node) {
            Operator::Selection(s) => std::mem::take(&mut s.conditions),
            other => {
                return Err(Error::internal(format!(
                    "expected Selection, got {}",
                    other.name()
                )));
            }
        };
        let conditions: Vec<Expr> = own
            .into_iter()
            .chain(predicates)
            .flat_map(split_conjunction)
            .collect();

        let (rest, _) = self.push_down_at(plan, child, conditions, depth + 1)?;
        if !rest.is_empty() {
            *plan.op_mut(node) = Operator::Selection(Selection { conditions: rest });
            return Ok((Vec::new(), node));
        }
        let child = plan.remove_node(node)?;
        debug!(selection = %plan.node(node).id, "removed redundant selection");
        Ok((Vec::new(), child))
    }

    fn push_aggregation(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let constants: Vec<Expr> = predicates.iter().filter(|p| p.is_constant()).cloned().collect();
        // Every predicate, constants included, stays above the aggregation.
        let rest = self.push_to_only_child(plan, node, constants, depth)?;
        self.wrap_child(plan, node, 0, rest)?;
        Ok((predicates, node))
    }

    fn push_apply(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let child = plan.child(node, 0)?;
        let (push, mut ret): (Vec<Expr>, Vec<Expr>) = predicates
            .into_iter()
            .partition(|p| is_covered_by(p, plan.schema(child)));
        let (child_ret, _) = self.push_down_at(plan, child, push, depth + 1)?;
        ret.extend(child_ret);
        Ok((ret, node))
    }

    fn push_limit(
        &self,
        plan: &mut LogicalPlan,
        node: NodeRef,
        predicates: Vec<Expr>,
        depth: usize,
    ) -> Result<PushDownResult> {
        let rest = self.push_to_only_child(plan, node, Vec::new(), depth)?;
        self.wrap_child(plan, node, 0, rest)?;
        Ok((predicates, node))
    }

    /// Materialises `rest` as a Selection over the current child of `parent`
    /// at `index`.
    fn wrap_child(
        &self,
        plan: &mut LogicalPlan,
        parent: NodeRef,
        index: usize,
        rest: Vec<Expr>,
    ) -> Result<()> {
        if rest.is_empty() {
            return Ok(());
        }
        let child = plan.child(parent, index)?;
        let selection = plan.add_selection(parent, child, rest)?;
        debug!(
            selection = %plan.node(selection).id,
            parent = %plan.node(parent).id,
            "materialised residual predicates"
        );
        Ok(())
    }
}

impl OptimizationPass for PredicatePushDown {
    fn name(&self) -> &'static str {
        "predicate_push_down"
    }

    #[instrument(skip_all, fields(pass = "predicate_push_down"))]
    fn apply_logical(&self, plan: &mut LogicalPlan) -> Result<()> {
        let root = plan.root()?;
        let (rest, _) = self.push_down(plan, root, Vec::new())?;
        if !rest.is_empty() {
            let root = plan.root()?;
            let schema: PlanSchema = plan.schema(root).clone();
            let selection = plan.add_node(
                Operator::Selection(Selection { conditions: rest }),
                schema,
                vec![root],
            );
            plan.set_root(selection);
            debug!(selection = %plan.node(selection).id, "residual predicates kept at root");
        }
        plan.check_links()
    }
}

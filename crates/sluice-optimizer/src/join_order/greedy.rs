use rustc_hash::FxHashSet;
use sluice_common::error::{Error, Result};
use sluice_ir::{Expr, Join, JoinType, LogicalPlan, NodeRef, Operator, ScalarFunction};
use tracing::debug;

use super::JoinReorderSolver;
use super::cost_model::{CostModel, JoinCost};
use super::join_graph::{JoinEdge, JoinGraph, JoinRelation, RelationId};
use super::join_group::JoinGroup;
use crate::planner::predicate::{extract_columns, extract_on_condition};

/// Left-deep greedy join ordering: start from the smallest relation and
/// repeatedly join the candidate with the cheapest estimated join. Ties go
/// to the relation that came first in the original tree.
pub struct GreedyJoinReorderer {
    cost_model: CostModel,
}

impl GreedyJoinReorderer {
    pub fn new(cost_model: CostModel) -> Self {
        Self { cost_model }
    }

    /// Relations of `group` with equality edges taken from the group's ON
    /// conditions and from `predicates`.
    pub fn build_graph(
        &self,
        plan: &LogicalPlan,
        group: &JoinGroup,
        predicates: &[Expr],
    ) -> JoinGraph {
        let mut graph = JoinGraph::new();
        for node in &group.relations {
            graph.add_relation(JoinRelation {
                id: 0,
                original_position: 0,
                node: *node,
                schema: plan.schema(*node).clone(),
                row_count_estimate: self.cost_model.estimate_relation_rows(plan, *node),
            });
        }

        for predicate in group.conditions.iter().chain(predicates) {
            let Some(f) = predicate.as_function() else {
                continue;
            };
            if f.func != ScalarFunction::Eq {
                continue;
            }
            let (Some(left), Some(right)) = (
                f.args.first().and_then(Expr::as_column),
                f.args.get(1).and_then(Expr::as_column),
            ) else {
                continue;
            };
            let (Some(l), Some(r)) = (graph.relation_of(left), graph.relation_of(right)) else {
                continue;
            };
            if l == r {
                continue;
            }
            let selectivity_estimate = self.cost_model.estimate_equality_selectivity(
                graph.relations()[l].row_count_estimate,
                graph.relations()[r].row_count_estimate,
            );
            graph.add_edge(JoinEdge {
                left_relation: l,
                right_relation: r,
                predicate: predicate.clone(),
                selectivity_estimate,
            });
        }
        graph
    }

    fn find_smallest_relation(
        &self,
        graph: &JoinGraph,
        available: &FxHashSet<RelationId>,
    ) -> Option<RelationId> {
        graph
            .relations()
            .iter()
            .filter(|r| available.contains(&r.id))
            .min_by_key(|r| (r.row_count_estimate, r.original_position))
            .map(|r| r.id)
    }

    fn find_best_next(
        &self,
        graph: &JoinGraph,
        current_relations: &[RelationId],
        current_row_count: usize,
        available: &FxHashSet<RelationId>,
    ) -> Option<(RelationId, JoinCost)> {
        let mut best: Option<(RelationId, JoinCost, usize)> = None;
        for rel in graph.relations() {
            if !available.contains(&rel.id) {
                continue;
            }
            let edges = graph.get_edges_to(current_relations, rel.id);
            let cost = self.cost_model.estimate_join_cost(
                current_row_count,
                rel.row_count_estimate,
                &edges,
            );
            let better = match &best {
                None => true,
                Some((_, best_cost, best_pos)) => {
                    cost.total_cost < best_cost.total_cost
                        || (cost.total_cost == best_cost.total_cost
                            && rel.original_position < *best_pos)
                }
            };
            if better {
                best = Some((rel.id, cost, rel.original_position));
            }
        }
        best.map(|(id, cost, _)| (id, cost))
    }

    /// Relation ids in join order.
    pub fn join_order(&self, graph: &JoinGraph) -> Vec<RelationId> {
        let mut available: FxHashSet<RelationId> = (0..graph.relations().len()).collect();
        let mut order = Vec::with_capacity(available.len());

        let Some(first_id) = self.find_smallest_relation(graph, &available) else {
            return order;
        };
        available.remove(&first_id);
        order.push(first_id);
        let mut current_row_count = graph.relations()[first_id].row_count_estimate;

        while let Some((next_id, join_cost)) =
            self.find_best_next(graph, &order, current_row_count, &available)
        {
            available.remove(&next_id);
            order.push(next_id);
            current_row_count = join_cost.output_rows;
        }
        order
    }
}

impl Default for GreedyJoinReorderer {
    fn default() -> Self {
        Self::new(CostModel::new())
    }
}

/// Attaches `cond` to the lowest join in `built` whose output covers its
/// columns, or to the top join when none does.
fn place_condition(plan: &mut LogicalPlan, built: &[NodeRef], cond: Expr) -> Result<()> {
    let columns = extract_columns(&cond);
    let top = *built
        .last()
        .ok_or_else(|| Error::internal("no join to attach a condition to"))?;
    let target = if columns.is_empty() {
        top
    } else {
        built
            .iter()
            .copied()
            .find(|j| columns.iter().all(|c| plan.schema(*j).contains(c)))
            .unwrap_or(top)
    };

    let left = plan.child(target, 0)?;
    let right = plan.child(target, 1)?;
    let on = extract_on_condition(vec![cond], plan.schema(left), plan.schema(right));
    let join = plan
        .op_mut(target)
        .as_join_mut()
        .ok_or_else(|| Error::internal("reordered tree holds a non-join node"))?;
    join.equal_conditions.extend(on.equal);
    join.left_conditions.extend(on.left);
    join.right_conditions.extend(on.right);
    join.other_conditions.extend(on.other);
    Ok(())
}

impl JoinReorderSolver for GreedyJoinReorderer {
    fn reorder(
        &self,
        plan: &mut LogicalPlan,
        group: &JoinGroup,
        predicates: &[Expr],
    ) -> Result<NodeRef> {
        if group.relations.len() < 2 {
            return Err(Error::internal(format!(
                "join group needs at least two relations, got {}",
                group.relations.len()
            )));
        }
        let graph = self.build_graph(plan, group, predicates);
        let order = self.join_order(&graph);
        debug!(order = ?order, edges = graph.edges().len(), "greedy join order");

        let mut rels = order.iter().map(|id| &graph.relations()[*id]);
        let first = rels
            .next()
            .ok_or_else(|| Error::internal("empty join order"))?;
        let mut current = first.node;
        let mut current_schema = first.schema.clone();
        let mut built = Vec::with_capacity(order.len() - 1);
        for rel in rels {
            let schema = current_schema.merge(rel.schema.clone());
            let join = Join {
                reordered: true,
                ..Join::new(JoinType::Inner)
            };
            current = plan.add_node(Operator::Join(join), schema.clone(), vec![current, rel.node]);
            current_schema = schema;
            built.push(current);
        }

        for cond in &group.conditions {
            place_condition(plan, &built, cond.clone())?;
        }
        let schema = plan.schema(group.root).clone();
        plan.node_mut(current).schema = schema;
        Ok(current)
    }
}

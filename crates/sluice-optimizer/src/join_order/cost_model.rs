use sluice_ir::{LogicalPlan, NodeRef, Operator};

use super::join_graph::JoinEdge;

/// Rows assumed for a relation whose leaf carries no estimate.
pub const DEFAULT_ROW_COUNT: usize = 1000;

const CROSS_JOIN_PENALTY: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinCost {
    pub output_rows: usize,
    pub total_cost: f64,
}

/// Cardinality estimates for greedy join ordering, taken from the
/// `row_count` hints on data sources and table duals.
#[derive(Debug, Clone)]
pub struct CostModel {
    default_row_count: usize,
}

impl CostModel {
    pub fn new() -> Self {
        Self::with_default_row_count(DEFAULT_ROW_COUNT)
    }

    pub fn with_default_row_count(rows: usize) -> Self {
        Self {
            default_row_count: rows.max(1),
        }
    }

    /// Rows produced by one relation of a join group. The estimate starts at
    /// the leaf under the relation's single-input chain; each Selection on
    /// the way up halves it and each Limit caps it.
    pub fn estimate_relation_rows(&self, plan: &LogicalPlan, node: NodeRef) -> usize {
        let mut chain = Vec::new();
        let mut current = node;
        let leaf_rows = loop {
            match plan.op(current) {
                Operator::DataSource(ds) => {
                    break ds.row_count.unwrap_or(self.default_row_count);
                }
                Operator::TableDual(d) => break d.row_count,
                _ => match plan.children(current) {
                    [child] => {
                        chain.push(current);
                        current = *child;
                    }
                    _ => break self.default_row_count,
                },
            }
        };
        chain
            .iter()
            .rev()
            .fold(leaf_rows.max(1), |rows, n| match plan.op(*n) {
                Operator::Selection(_) => (rows / 2).max(1),
                Operator::Limit(l) => rows.min(l.count).max(1),
                _ => rows,
            })
    }

    /// Selectivity of `l = r` across relations of `left_rows` and
    /// `right_rows`, treating the larger side's column as a key.
    pub fn estimate_equality_selectivity(&self, left_rows: usize, right_rows: usize) -> f64 {
        1.0 / left_rows.max(right_rows).max(1) as f64
    }

    /// Cost of joining `right_rows` onto `left_rows` through `edges`: rows
    /// read from both inputs plus rows produced. Joins with no edge pay a
    /// cross-join penalty.
    pub fn estimate_join_cost(
        &self,
        left_rows: usize,
        right_rows: usize,
        edges: &[&JoinEdge],
    ) -> JoinCost {
        let selectivity: f64 = edges.iter().map(|e| e.selectivity_estimate).product();
        let output = (left_rows as f64 * right_rows as f64 * selectivity).ceil();
        let read = left_rows as f64 + right_rows as f64 + output;
        let penalty = if edges.is_empty() {
            CROSS_JOIN_PENALTY
        } else {
            1.0
        };
        JoinCost {
            output_rows: (output as usize).max(1),
            total_cost: read * penalty,
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::Arc;

use sluice_common::types::{DataType, Value};
use sluice_ir::{
    AggregateCall, Aggregation, Apply, Column, DataSource, Expr, IdAllocator, Join, JoinType,
    Limit, LogicalPlan, NodeRef, Operator, PlanSchema, Projection, ScalarFunction, Selection,
    Sort, SortItem, TableDual, Union,
};

pub fn lit(v: i64) -> Expr {
    Expr::literal(Value::int64(v))
}

pub fn lit_bool(v: bool) -> Expr {
    Expr::literal(Value::bool_val(v))
}

pub fn lit_str(v: &str) -> Expr {
    Expr::literal(Value::string(v))
}

/// Builds logical plans bottom-up for tests.
///
/// Every column gets a fresh id from the plan's allocator. Lookups by name
/// panic when the column is missing, which is what a test wants.
pub struct PlanBuilder {
    plan: LogicalPlan,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(IdAllocator::new()))
    }

    pub fn with_allocator(allocator: Arc<IdAllocator>) -> Self {
        Self {
            plan: LogicalPlan::new(allocator),
        }
    }

    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut LogicalPlan {
        &mut self.plan
    }

    fn new_column(&self, table: Option<&str>, name: &str, data_type: DataType) -> Column {
        let column = Column::new(self.plan.allocator().next_raw(), name, data_type);
        match table {
            Some(t) => column.with_table(t),
            None => column,
        }
    }

    /// Table scan with INT64 columns and no row-count estimate.
    pub fn scan(&mut self, table: &str, columns: &[&str]) -> NodeRef {
        self.scan_source(table, columns, None)
    }

    pub fn scan_with_rows(&mut self, table: &str, columns: &[&str], rows: usize) -> NodeRef {
        self.scan_source(table, columns, Some(rows))
    }

    fn scan_source(&mut self, table: &str, columns: &[&str], rows: Option<usize>) -> NodeRef {
        let schema = PlanSchema::from_columns(
            columns
                .iter()
                .map(|c| self.new_column(Some(table), c, DataType::Int64))
                .collect(),
        );
        self.plan.add_node(
            Operator::DataSource(DataSource {
                table_name: table.to_string(),
                row_count: rows,
            }),
            schema,
            vec![],
        )
    }

    pub fn dual(&mut self, rows: usize) -> NodeRef {
        self.plan.add_node(
            Operator::TableDual(TableDual { row_count: rows }),
            PlanSchema::new(),
            vec![],
        )
    }

    /// Column of `node`'s output named `name` or `table.name`.
    pub fn column(&self, node: NodeRef, name: &str) -> Column {
        let (table, name) = match name.split_once('.') {
            Some((t, n)) => (Some(t), n),
            None => (None, name),
        };
        self.plan
            .schema(node)
            .columns()
            .iter()
            .find(|c| c.name == name && (table.is_none() || c.table.as_deref() == table))
            .cloned()
            .unwrap_or_else(|| panic!("no column {} in {}", name, self.plan.op(node).name()))
    }

    pub fn col(&self, node: NodeRef, name: &str) -> Expr {
        Expr::column(self.column(node, name))
    }

    pub fn select(&mut self, child: NodeRef, conditions: Vec<Expr>) -> NodeRef {
        let schema = self.plan.schema(child).clone();
        self.plan.add_node(
            Operator::Selection(Selection { conditions }),
            schema,
            vec![child],
        )
    }

    pub fn join(&mut self, left: NodeRef, right: NodeRef, join_type: JoinType) -> NodeRef {
        self.join_on(left, right, join_type, vec![])
    }

    /// Join whose ON conditions are sorted into the payload lists the way a
    /// planner would: cross-side column equalities, one-side conditions and
    /// the rest.
    pub fn join_on(
        &mut self,
        left: NodeRef,
        right: NodeRef,
        join_type: JoinType,
        on: Vec<Expr>,
    ) -> NodeRef {
        let left_schema = self.plan.schema(left).clone();
        let right_schema = self.plan.schema(right).clone();
        let mut join = Join::new(join_type);
        for cond in on {
            let cols = columns_of(&cond);
            let in_left = cols.iter().all(|c| left_schema.contains(c));
            let in_right = cols.iter().all(|c| right_schema.contains(c));
            if is_cross_equality(&cond, &left_schema, &right_schema) {
                join.equal_conditions.push(cond);
            } else if !cols.is_empty() && in_left {
                join.left_conditions.push(cond);
            } else if !cols.is_empty() && in_right {
                join.right_conditions.push(cond);
            } else {
                join.other_conditions.push(cond);
            }
        }

        let schema = match join_type {
            JoinType::Inner | JoinType::LeftOuter | JoinType::RightOuter => {
                left_schema.merge(right_schema)
            }
            JoinType::Semi => left_schema,
            JoinType::SemiWithAux => {
                let mut schema = left_schema;
                schema.push(self.new_column(None, "aux", DataType::Bool));
                schema
            }
        };
        self.plan
            .add_node(Operator::Join(join), schema, vec![left, right])
    }

    pub fn project(&mut self, child: NodeRef, exprs: Vec<(&str, Expr)>) -> NodeRef {
        let mut columns = Vec::with_capacity(exprs.len());
        let mut out = Vec::with_capacity(exprs.len());
        for (name, expr) in exprs {
            columns.push(self.new_column(Some("p"), name, expr.data_type()));
            out.push(expr);
        }
        self.plan.add_node(
            Operator::Projection(Projection { exprs: out }),
            PlanSchema::from_columns(columns),
            vec![child],
        )
    }

    /// Union whose output columns take their names from the first branch.
    pub fn union(&mut self, branches: Vec<NodeRef>, all: bool) -> NodeRef {
        let columns = match branches.first() {
            Some(first) => self
                .plan
                .schema(*first)
                .columns()
                .iter()
                .map(|c| self.new_column(Some("u"), &c.name, c.data_type))
                .collect(),
            None => Vec::new(),
        };
        self.plan.add_node(
            Operator::Union(Union { all }),
            PlanSchema::from_columns(columns),
            branches,
        )
    }

    /// Aggregation outputting one column per group-by expression followed by
    /// one per aggregate.
    pub fn aggregate(
        &mut self,
        child: NodeRef,
        group_by: Vec<(&str, Expr)>,
        aggregates: Vec<(&str, AggregateCall)>,
    ) -> NodeRef {
        let mut columns = Vec::new();
        let mut keys = Vec::new();
        for (name, expr) in group_by {
            columns.push(self.new_column(Some("g"), name, expr.data_type()));
            keys.push(expr);
        }
        let mut calls = Vec::new();
        for (name, call) in aggregates {
            columns.push(self.new_column(Some("g"), name, DataType::Int64));
            calls.push(call);
        }
        self.plan.add_node(
            Operator::Aggregation(Aggregation {
                group_by: keys,
                aggregates: calls,
            }),
            PlanSchema::from_columns(columns),
            vec![child],
        )
    }

    pub fn apply(&mut self, child: NodeRef, correlated_columns: Vec<Column>) -> NodeRef {
        let schema = self.plan.schema(child).clone();
        self.plan.add_node(
            Operator::Apply(Apply { correlated_columns }),
            schema,
            vec![child],
        )
    }

    pub fn limit(&mut self, child: NodeRef, offset: usize, count: usize) -> NodeRef {
        self.unary(child, Operator::Limit(Limit { offset, count }))
    }

    pub fn sort(&mut self, child: NodeRef, by: Vec<SortItem>) -> NodeRef {
        self.unary(child, Operator::Sort(Sort { by }))
    }

    /// Any single-child operator whose output schema equals its input's.
    pub fn unary(&mut self, child: NodeRef, op: Operator) -> NodeRef {
        let schema = self.plan.schema(child).clone();
        self.plan.add_node(op, schema, vec![child])
    }

    pub fn exists(&mut self, child: NodeRef) -> NodeRef {
        let column = self.new_column(None, "exists", DataType::Bool);
        let schema = PlanSchema::from_columns(vec![column]);
        self.plan.add_node(Operator::Exists, schema, vec![child])
    }

    pub fn finish(mut self, root: NodeRef) -> LogicalPlan {
        self.plan.set_root(root);
        self.plan
    }
}

fn columns_of(expr: &Expr) -> Vec<Column> {
    match expr {
        Expr::Column(c) => vec![c.clone()],
        Expr::Constant(_) => vec![],
        Expr::ScalarFunction(f) => f.args.iter().flat_map(columns_of).collect(),
    }
}

fn is_cross_equality(expr: &Expr, left: &PlanSchema, right: &PlanSchema) -> bool {
    let Some(f) = expr.as_function() else {
        return false;
    };
    if f.func != ScalarFunction::Eq {
        return false;
    }
    match (
        f.args.first().and_then(Expr::as_column),
        f.args.get(1).and_then(Expr::as_column),
    ) {
        (Some(a), Some(b)) => left.contains(a) && right.contains(b),
        _ => false,
    }
}

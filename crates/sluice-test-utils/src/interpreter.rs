//! Row-at-a-time reference interpreter for logical plans.
//!
//! It evaluates a plan exactly as written, with no optimization of its own,
//! so a rewritten plan can be checked against the original over the same
//! tables.

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use sluice_common::error::{Error, Result};
use sluice_common::types::Value;
use sluice_functions::{compare_values, evaluate};
use sluice_ir::{
    AggregateCall, AggregateFunction, Expr, JoinType, LogicalPlan, NodeRef, Operator, PlanSchema,
    ScalarFunction,
};

pub type Row = Vec<Value>;

/// In-memory tables keyed by name. Rows follow the column order of the
/// scanning DataSource.
#[derive(Debug, Default, Clone)]
pub struct Database {
    tables: FxHashMap<String, Vec<Row>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: &str, rows: Vec<Row>) {
        self.tables.insert(table.to_string(), rows);
    }

    pub fn with_table(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.insert(table, rows);
        self
    }

    fn rows(&self, table: &str) -> Result<&[Row]> {
        self.tables
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::invalid_plan(format!("unknown table {}", table)))
    }
}

pub fn execute(plan: &LogicalPlan, db: &Database) -> Result<Vec<Row>> {
    eval_node(plan, plan.root()?, db)
}

pub fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort();
    rows
}

/// Keeps the rows on which every predicate is TRUE.
pub fn apply_filter(rows: Vec<Row>, schema: &PlanSchema, predicates: &[Expr]) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if accepts(predicates, schema, &row)? {
            out.push(row);
        }
    }
    Ok(out)
}

fn accepts(predicates: &[Expr], schema: &PlanSchema, row: &Row) -> Result<bool> {
    for p in predicates {
        let v = eval_expr(p, schema, row)?;
        if v.is_null() || !v.to_bool()? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_expr(expr: &Expr, schema: &PlanSchema, row: &Row) -> Result<Value> {
    match expr {
        Expr::Column(c) => schema
            .index_of(c)
            .and_then(|i| row.get(i))
            .cloned()
            .ok_or_else(|| Error::column_not_found(c.qualified_name())),
        Expr::Constant(c) => Ok(c.value.clone()),
        Expr::ScalarFunction(f) => {
            let args = f
                .args
                .iter()
                .map(|a| eval_expr(a, schema, row))
                .collect::<Result<Vec<_>>>()?;
            evaluate(f.func, &args)
        }
    }
}

/// Reorders `row`, laid out per `from`, into the column order of `to`.
fn remap(row: &Row, from: &PlanSchema, to: &PlanSchema) -> Result<Row> {
    to.columns()
        .iter()
        .map(|c| {
            from.index_of(c)
                .and_then(|i| row.get(i))
                .cloned()
                .ok_or_else(|| Error::column_not_found(c.qualified_name()))
        })
        .collect()
}

fn only_child(plan: &LogicalPlan, node: NodeRef, db: &Database) -> Result<Vec<Row>> {
    eval_node(plan, plan.child(node, 0)?, db)
}

fn eval_node(plan: &LogicalPlan, node: NodeRef, db: &Database) -> Result<Vec<Row>> {
    let schema = plan.schema(node);
    match plan.op(node) {
        Operator::DataSource(ds) => Ok(db.rows(&ds.table_name)?.to_vec()),
        Operator::TableDual(d) => Ok(vec![Vec::new(); d.row_count]),
        Operator::Selection(s) => apply_filter(only_child(plan, node, db)?, schema, &s.conditions),
        Operator::Join(j) => {
            let left = plan.child(node, 0)?;
            let right = plan.child(node, 1)?;
            let left_rows = eval_node(plan, left, db)?;
            let right_rows = eval_node(plan, right, db)?;
            let combined = plan.schema(left).clone().merge(plan.schema(right).clone());
            let conditions = j.all_conditions();
            let left_width = plan.schema(left).len();
            let right_width = plan.schema(right).len();

            let mut matched_right = vec![false; right_rows.len()];
            let mut out = Vec::new();
            for l in &left_rows {
                let mut any = false;
                for (ri, r) in right_rows.iter().enumerate() {
                    let row: Row = l.iter().chain(r.iter()).cloned().collect();
                    if accepts(&conditions, &combined, &row)? {
                        any = true;
                        matched_right[ri] = true;
                        if matches!(
                            j.join_type,
                            JoinType::Inner | JoinType::LeftOuter | JoinType::RightOuter
                        ) {
                            out.push(remap(&row, &combined, schema)?);
                        }
                    }
                }
                match j.join_type {
                    JoinType::LeftOuter if !any => {
                        let row: Row = l
                            .iter()
                            .cloned()
                            .chain(std::iter::repeat_n(Value::Null, right_width))
                            .collect();
                        out.push(remap(&row, &combined, schema)?);
                    }
                    JoinType::Semi if any => out.push(l.clone()),
                    JoinType::SemiWithAux => {
                        let mut row = l.clone();
                        row.push(Value::bool_val(any));
                        out.push(row);
                    }
                    _ => {}
                }
            }
            if j.join_type == JoinType::RightOuter {
                for (ri, r) in right_rows.iter().enumerate() {
                    if !matched_right[ri] {
                        let row: Row = std::iter::repeat_n(Value::Null, left_width)
                            .chain(r.iter().cloned())
                            .collect();
                        out.push(remap(&row, &combined, schema)?);
                    }
                }
            }
            Ok(out)
        }
        Operator::Projection(p) => {
            let child = plan.child(node, 0)?;
            let child_schema = plan.schema(child);
            eval_node(plan, child, db)?
                .iter()
                .map(|row| {
                    p.exprs
                        .iter()
                        .map(|e| eval_expr(e, child_schema, row))
                        .collect::<Result<Row>>()
                })
                .collect()
        }
        Operator::Union(u) => {
            let mut out = Vec::new();
            for branch in plan.children(node) {
                out.extend(eval_node(plan, *branch, db)?);
            }
            if !u.all {
                out = distinct(out);
            }
            Ok(out)
        }
        Operator::Aggregation(agg) => {
            let child = plan.child(node, 0)?;
            let child_schema = plan.schema(child);
            let rows = eval_node(plan, child, db)?;

            let mut order: Vec<Row> = Vec::new();
            let mut groups: FxHashMap<Row, Vec<Row>> = FxHashMap::default();
            if agg.group_by.is_empty() {
                order.push(Vec::new());
                groups.insert(Vec::new(), Vec::new());
            }
            for row in rows {
                let key = agg
                    .group_by
                    .iter()
                    .map(|e| eval_expr(e, child_schema, &row))
                    .collect::<Result<Row>>()?;
                if !groups.contains_key(&key) {
                    order.push(key.clone());
                }
                groups.entry(key).or_default().push(row);
            }

            let mut out = Vec::with_capacity(order.len());
            for key in order {
                let members = groups.remove(&key).unwrap_or_default();
                let mut row = key;
                for call in &agg.aggregates {
                    row.push(eval_aggregate(call, child_schema, &members)?);
                }
                out.push(row);
            }
            Ok(out)
        }
        Operator::Limit(l) => Ok(only_child(plan, node, db)?
            .into_iter()
            .skip(l.offset)
            .take(l.count)
            .collect()),
        Operator::Sort(s) => {
            let rows = only_child(plan, node, db)?;
            let mut keyed = rows
                .into_iter()
                .map(|row| {
                    let key = s
                        .by
                        .iter()
                        .map(|item| eval_expr(&item.expr, schema, &row))
                        .collect::<Result<Row>>()?;
                    Ok((key, row))
                })
                .collect::<Result<Vec<_>>>()?;
            keyed.sort_by(|(a, _), (b, _)| {
                for (i, item) in s.by.iter().enumerate() {
                    let ord = a[i].cmp(&b[i]);
                    let ord = if item.desc { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            Ok(keyed.into_iter().map(|(_, row)| row).collect())
        }
        Operator::Trim => {
            let child = plan.child(node, 0)?;
            eval_node(plan, child, db)?
                .iter()
                .map(|row| remap(row, plan.schema(child), schema))
                .collect()
        }
        Operator::MaxOneRow => {
            let rows = only_child(plan, node, db)?;
            if rows.len() > 1 {
                return Err(Error::invalid_plan("subquery returned more than one row"));
            }
            Ok(rows)
        }
        Operator::Exists => {
            let rows = only_child(plan, node, db)?;
            Ok(vec![vec![Value::bool_val(!rows.is_empty())]])
        }
        Operator::Distinct => Ok(distinct(only_child(plan, node, db)?)),
        // The subquery body of an Apply and the targets of DML are not
        // modelled; these nodes expose the rows flowing into them.
        Operator::Apply(_)
        | Operator::SelectLock(_)
        | Operator::Insert(_)
        | Operator::Update(_)
        | Operator::Delete(_) => match plan.children(node) {
            [] => Ok(Vec::new()),
            _ => only_child(plan, node, db),
        },
    }
}

fn distinct(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = FxHashSet::default();
    rows.into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

fn eval_aggregate(call: &AggregateCall, schema: &PlanSchema, rows: &[Row]) -> Result<Value> {
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        match call.args.first() {
            Some(arg) => {
                let v = eval_expr(arg, schema, row)?;
                if !v.is_null() {
                    values.push(v);
                }
            }
            None => values.push(Value::int64(1)),
        }
    }
    if call.distinct {
        values = distinct(values.into_iter().map(|v| vec![v]).collect())
            .into_iter()
            .flatten()
            .collect();
    }

    match call.func {
        AggregateFunction::Count => Ok(Value::int64(values.len() as i64)),
        AggregateFunction::Sum | AggregateFunction::Avg => {
            let mut acc = Value::Null;
            for v in &values {
                acc = if acc.is_null() {
                    v.clone()
                } else {
                    evaluate(ScalarFunction::Plus, &[acc, v.clone()])?
                };
            }
            if call.func == AggregateFunction::Avg && !values.is_empty() {
                evaluate(
                    ScalarFunction::Div,
                    &[acc, Value::int64(values.len() as i64)],
                )
            } else {
                Ok(acc)
            }
        }
        AggregateFunction::Min | AggregateFunction::Max => {
            let mut best: Option<Value> = None;
            for v in values {
                best = match best {
                    None => Some(v),
                    Some(b) => {
                        let ord = compare_values(&v, &b)?;
                        let better = match call.func {
                            AggregateFunction::Min => ord == Some(Ordering::Less),
                            _ => ord == Some(Ordering::Greater),
                        };
                        Some(if better { v } else { b })
                    }
                };
            }
            Ok(best.unwrap_or(Value::Null))
        }
    }
}

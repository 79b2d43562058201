use rustc_hash::FxHashSet;
use sluice_common::error::{Error, Result};
use sluice_ir::{Column, Expr, PlanSchema, ScalarFunction, ScalarFunctionExpr};
use tracing::warn;

/// Columns referenced by `expr`, in order of first appearance, without
/// duplicates.
pub fn extract_columns(expr: &Expr) -> Vec<Column> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    collect_columns(expr, &mut seen, &mut out);
    out
}

fn collect_columns(expr: &Expr, seen: &mut FxHashSet<usize>, out: &mut Vec<Column>) {
    match expr {
        Expr::Column(c) => {
            if seen.insert(c.unique_id) {
                out.push(c.clone());
            }
        }
        Expr::Constant(_) => {}
        Expr::ScalarFunction(f) => {
            for arg in &f.args {
                collect_columns(arg, seen, out);
            }
        }
    }
}

/// True when every column `expr` references is produced by `schema`.
/// Expressions without columns are trivially covered.
pub fn is_covered_by(expr: &Expr, schema: &PlanSchema) -> bool {
    extract_columns(expr).iter().all(|c| schema.contains(c))
}

pub fn references_any(expr: &Expr, schema: &PlanSchema) -> bool {
    extract_columns(expr).iter().any(|c| schema.contains(c))
}

/// Rewrites `expr`, replacing each column found at position `i` of `schema`
/// with `replacements[i]`. A column missing from `schema` is a
/// [`Error::ColumnNotFound`].
pub fn substitute_columns(
    expr: &Expr,
    schema: &PlanSchema,
    replacements: &[Expr],
) -> Result<Expr> {
    match expr {
        Expr::Column(c) => {
            let Some(idx) = schema.index_of(c) else {
                warn!(
                    column = %c.qualified_name(),
                    id = c.unique_id,
                    "column missing from schema during substitution"
                );
                return Err(Error::column_not_found(c.qualified_name()));
            };
            replacements.get(idx).cloned().ok_or_else(|| {
                Error::internal(format!(
                    "no replacement at position {} for {}",
                    idx,
                    c.qualified_name()
                ))
            })
        }
        Expr::Constant(_) => Ok(expr.clone()),
        Expr::ScalarFunction(f) => {
            let args = f
                .args
                .iter()
                .map(|arg| substitute_columns(arg, schema, replacements))
                .collect::<Result<Vec<_>>>()?;
            Ok(Expr::ScalarFunction(ScalarFunctionExpr {
                func: f.func,
                args,
                return_type: f.return_type,
            }))
        }
    }
}

/// Flattens nested `and` calls into their conjuncts.
pub fn split_conjunction(expr: Expr) -> Vec<Expr> {
    match expr {
        Expr::ScalarFunction(f) if f.func == ScalarFunction::And => {
            f.args.into_iter().flat_map(split_conjunction).collect()
        }
        other => vec![other],
    }
}

/// ON-clause conditions of a join, classified by the inputs they reference.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OnConditions {
    /// `eq(left_col, right_col)`, always oriented left then right.
    pub equal: Vec<Expr>,
    pub left: Vec<Expr>,
    pub right: Vec<Expr>,
    pub other: Vec<Expr>,
}

/// Splits `predicates` by the join side(s) they reference.
///
/// A column-to-column equality across the two inputs becomes an equal
/// condition. Otherwise a predicate covered by the right input goes right,
/// one covered by the left input goes left, and anything else is "other".
/// The right side is tested first, so column-free predicates go right.
pub fn extract_on_condition(
    predicates: Vec<Expr>,
    left: &PlanSchema,
    right: &PlanSchema,
) -> OnConditions {
    let mut out = OnConditions::default();
    for expr in predicates {
        if let Some(eq) = as_cross_equality(&expr, left, right) {
            out.equal.push(eq);
            continue;
        }
        if is_covered_by(&expr, right) {
            out.right.push(expr);
        } else if is_covered_by(&expr, left) {
            out.left.push(expr);
        } else {
            out.other.push(expr);
        }
    }
    out
}

fn as_cross_equality(expr: &Expr, left: &PlanSchema, right: &PlanSchema) -> Option<Expr> {
    let f = expr.as_function()?;
    if f.func != ScalarFunction::Eq {
        return None;
    }
    let [a, b] = f.args.as_slice() else {
        return None;
    };
    let (ca, cb) = (a.as_column()?, b.as_column()?);
    if left.contains(ca) && right.contains(cb) {
        Some(expr.clone())
    } else if left.contains(cb) && right.contains(ca) {
        Some(Expr::eq(b.clone(), a.clone()))
    } else {
        None
    }
}

//! Null-rejection analysis.
//!
//! A predicate is null-rejected with respect to a schema when it evaluates to
//! NULL or FALSE on every row whose columns from that schema are all NULL,
//! i.e. on the null-extended rows an outer join produces for that side.

use sluice_common::error::Result;
use sluice_common::types::Value;
use sluice_functions::{is_control_function, new_function};
use sluice_ir::{Constant, Expr, PlanSchema, ScalarFunction, ScalarFunctionExpr};

use super::predicate::references_any;

pub fn is_null_rejected(schema: &PlanSchema, expr: &Expr) -> Result<bool> {
    match expr {
        Expr::Constant(c) => rejects(&c.value),
        Expr::Column(c) => Ok(schema.contains(c)),
        Expr::ScalarFunction(f) => match f.func {
            ScalarFunction::Or => {
                for arg in &f.args {
                    if !is_null_rejected(schema, arg)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ScalarFunction::And => {
                for arg in &f.args {
                    if is_null_rejected(schema, arg)? {
                        return Ok(true);
                    }
                }
                evaluates_to_rejection(schema, expr)
            }
            func if is_control_function(func) => Ok(false),
            _ => evaluates_to_rejection(schema, expr),
        },
    }
}

fn evaluates_to_rejection(schema: &PlanSchema, expr: &Expr) -> Result<bool> {
    if !references_any(expr, schema) {
        return Ok(false);
    }
    match evaluate_with_nulls(expr, schema)? {
        Expr::Constant(c) => rejects(&c.value),
        _ => Ok(false),
    }
}

/// NULL and FALSE reject a row. Values that cannot be read as a boolean are
/// an error.
fn rejects(value: &Value) -> Result<bool> {
    if value.is_null() {
        return Ok(true);
    }
    Ok(!value.to_bool()?)
}

/// Functions that return NULL whenever any argument is NULL.
fn is_null_strict(func: ScalarFunction) -> bool {
    (func.is_comparison() && func != ScalarFunction::NullEq)
        || matches!(
            func,
            ScalarFunction::Plus
                | ScalarFunction::Minus
                | ScalarFunction::Mul
                | ScalarFunction::Div
                | ScalarFunction::Not
                | ScalarFunction::Xor
        )
}

/// Rebuilds `expr` with every column of `schema` replaced by a typed NULL,
/// folding each function whose arguments all became constant. Columns from
/// other schemas are left in place, so the result is a constant only when
/// the outcome does not depend on them, either because every argument
/// folded or because a strict function received a NULL.
pub fn evaluate_with_nulls(expr: &Expr, schema: &PlanSchema) -> Result<Expr> {
    match expr {
        Expr::Column(c) if schema.contains(c) => Ok(Expr::Constant(Constant {
            value: Value::Null,
            data_type: c.data_type,
        })),
        Expr::Column(_) | Expr::Constant(_) => Ok(expr.clone()),
        Expr::ScalarFunction(ScalarFunctionExpr {
            func,
            args,
            return_type,
        }) => {
            let args = args
                .iter()
                .map(|arg| evaluate_with_nulls(arg, schema))
                .collect::<Result<Vec<_>>>()?;
            let has_null = args
                .iter()
                .any(|a| matches!(a, Expr::Constant(c) if c.value.is_null()));
            if has_null && is_null_strict(*func) {
                return Ok(Expr::Constant(Constant {
                    value: Value::Null,
                    data_type: *return_type,
                }));
            }
            new_function(*func, *return_type, args)
        }
    }
}

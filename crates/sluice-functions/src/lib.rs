//! Construction and constant evaluation of scalar functions.
//!
//! [`new_function`] is the single entry point used by the optimizer to build
//! a function call: it validates the argument count and folds the call into a
//! constant when every argument is already constant. Evaluation follows SQL
//! three-valued logic.

mod arithmetic;
mod comparison;
mod control;
mod logic;

use sluice_common::error::{Error, Result};
use sluice_common::types::{DataType, Value};
use sluice_ir::{Constant, Expr, ScalarFunction, ScalarFunctionExpr};

pub use comparison::compare_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Exact(usize),
    AtLeast(usize),
}

fn arity(func: ScalarFunction) -> Arity {
    match func {
        ScalarFunction::Not | ScalarFunction::IsNull => Arity::Exact(1),
        ScalarFunction::Eq
        | ScalarFunction::NotEq
        | ScalarFunction::Lt
        | ScalarFunction::LtEq
        | ScalarFunction::Gt
        | ScalarFunction::GtEq
        | ScalarFunction::NullEq
        | ScalarFunction::And
        | ScalarFunction::Or
        | ScalarFunction::Xor
        | ScalarFunction::Plus
        | ScalarFunction::Minus
        | ScalarFunction::Mul
        | ScalarFunction::Div
        | ScalarFunction::IfNull
        | ScalarFunction::NullIf => Arity::Exact(2),
        ScalarFunction::If => Arity::Exact(3),
        ScalarFunction::Coalesce => Arity::AtLeast(1),
    }
}

fn check_arity(func: ScalarFunction, given: usize) -> Result<()> {
    match arity(func) {
        Arity::Exact(n) if n != given => Err(Error::invalid_function(format!(
            "{} expects {} argument(s), got {}",
            func, n, given
        ))),
        Arity::AtLeast(n) if given < n => Err(Error::invalid_function(format!(
            "{} expects at least {} argument(s), got {}",
            func, n, given
        ))),
        _ => Ok(()),
    }
}

/// Functions whose result depends on which branch is taken. They may turn a
/// NULL argument into a non-NULL result.
pub fn is_control_function(func: ScalarFunction) -> bool {
    matches!(
        func,
        ScalarFunction::If
            | ScalarFunction::IfNull
            | ScalarFunction::NullIf
            | ScalarFunction::Coalesce
    )
}

/// Evaluates `func` over already computed argument values.
pub fn evaluate(func: ScalarFunction, args: &[Value]) -> Result<Value> {
    check_arity(func, args.len())?;
    match func {
        ScalarFunction::Eq
        | ScalarFunction::NotEq
        | ScalarFunction::Lt
        | ScalarFunction::LtEq
        | ScalarFunction::Gt
        | ScalarFunction::GtEq
        | ScalarFunction::NullEq => comparison::evaluate(func, &args[0], &args[1]),
        ScalarFunction::And
        | ScalarFunction::Or
        | ScalarFunction::Xor
        | ScalarFunction::Not
        | ScalarFunction::IsNull => logic::evaluate(func, args),
        ScalarFunction::Plus
        | ScalarFunction::Minus
        | ScalarFunction::Mul
        | ScalarFunction::Div => arithmetic::evaluate(func, &args[0], &args[1]),
        ScalarFunction::If
        | ScalarFunction::IfNull
        | ScalarFunction::NullIf
        | ScalarFunction::Coalesce => control::evaluate(func, args),
    }
}

/// Builds `func(args...)`, folding it to a constant when all arguments are
/// constants. Fails with [`Error::InvalidFunction`] on a wrong argument count
/// and propagates coercion errors raised while folding.
pub fn new_function(func: ScalarFunction, return_type: DataType, args: Vec<Expr>) -> Result<Expr> {
    check_arity(func, args.len())?;

    let constants: Option<Vec<Value>> = args
        .iter()
        .map(|arg| match arg {
            Expr::Constant(c) => Some(c.value.clone()),
            _ => None,
        })
        .collect();

    match constants {
        Some(values) => {
            let value = evaluate(func, &values)?;
            let data_type = if value.is_null() {
                return_type
            } else {
                value.data_type()
            };
            Ok(Expr::Constant(Constant { value, data_type }))
        }
        None => Ok(Expr::ScalarFunction(ScalarFunctionExpr {
            func,
            args,
            return_type,
        })),
    }
}

#[cfg(test)]
mod tests {
    use sluice_ir::Column;

    use super::*;

    fn lit(v: i64) -> Expr {
        Expr::literal(Value::int64(v))
    }

    #[test]
    fn folds_constant_arguments() {
        let e = new_function(ScalarFunction::Eq, DataType::Bool, vec![lit(5), lit(5)]).unwrap();
        assert_eq!(e, Expr::literal(Value::bool_val(true)));
    }

    #[test]
    fn null_result_keeps_return_type() {
        let e = new_function(
            ScalarFunction::Eq,
            DataType::Bool,
            vec![Expr::null(), lit(5)],
        )
        .unwrap();
        match e {
            Expr::Constant(c) => {
                assert!(c.value.is_null());
                assert_eq!(c.data_type, DataType::Bool);
            }
            other => panic!("expected constant, got {:?}", other),
        }
    }

    #[test]
    fn keeps_call_with_column_argument() {
        let col = Expr::column(Column::new(1, "a", DataType::Int64));
        let e = new_function(ScalarFunction::Lt, DataType::Bool, vec![col, lit(10)]).unwrap();
        assert!(matches!(e, Expr::ScalarFunction(_)));
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = new_function(ScalarFunction::Eq, DataType::Bool, vec![lit(1)]).unwrap_err();
        assert!(matches!(err, Error::InvalidFunction(_)));

        let err = new_function(ScalarFunction::Coalesce, DataType::Int64, vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidFunction(_)));
    }

    #[test]
    fn propagates_coercion_error() {
        let err = new_function(
            ScalarFunction::And,
            DataType::Bool,
            vec![Expr::literal(Value::string("abc")), lit(1)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidLiteral(_)));
    }

    #[test]
    fn control_functions_are_classified() {
        assert!(is_control_function(ScalarFunction::IfNull));
        assert!(is_control_function(ScalarFunction::Coalesce));
        assert!(!is_control_function(ScalarFunction::Eq));
        assert!(!is_control_function(ScalarFunction::Or));
    }
}

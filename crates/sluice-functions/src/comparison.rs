use std::cmp::Ordering;

use sluice_common::error::{Error, Result};
use sluice_common::types::Value;
use sluice_ir::ScalarFunction;

/// Orders two non-NULL values. Returns `Ok(None)` when either side is NULL.
/// Mixed types are compared numerically, so a malformed numeric string is an
/// error rather than an arbitrary ordering.
pub fn compare_values(left: &Value, right: &Value) -> Result<Option<Ordering>> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(None),
        (Value::Int64(a), Value::Int64(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        _ => {
            let (Some(a), Some(b)) = (left.to_f64()?, right.to_f64()?) else {
                return Ok(None);
            };
            a.partial_cmp(&b).map(Some).ok_or_else(|| {
                Error::type_mismatch("comparable numbers", format!("{} and {}", left, right))
            })
        }
    }
}

pub(crate) fn evaluate(func: ScalarFunction, left: &Value, right: &Value) -> Result<Value> {
    if func == ScalarFunction::NullEq {
        return match (left.is_null(), right.is_null()) {
            (true, true) => Ok(Value::bool_val(true)),
            (true, false) | (false, true) => Ok(Value::bool_val(false)),
            (false, false) => Ok(Value::bool_val(
                compare_values(left, right)? == Some(Ordering::Equal),
            )),
        };
    }

    let Some(ord) = compare_values(left, right)? else {
        return Ok(Value::Null);
    };
    let result = match func {
        ScalarFunction::Eq => ord == Ordering::Equal,
        ScalarFunction::NotEq => ord != Ordering::Equal,
        ScalarFunction::Lt => ord == Ordering::Less,
        ScalarFunction::LtEq => ord != Ordering::Greater,
        ScalarFunction::Gt => ord == Ordering::Greater,
        ScalarFunction::GtEq => ord != Ordering::Less,
        other => {
            return Err(Error::internal(format!(
                "{} is not a comparison function",
                other
            )));
        }
    };
    Ok(Value::bool_val(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_operand_yields_null() {
        let v = evaluate(ScalarFunction::Eq, &Value::Null, &Value::int64(5)).unwrap();
        assert!(v.is_null());
        let v = evaluate(ScalarFunction::Lt, &Value::int64(5), &Value::Null).unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn null_safe_equality() {
        assert_eq!(
            evaluate(ScalarFunction::NullEq, &Value::Null, &Value::Null).unwrap(),
            Value::bool_val(true)
        );
        assert_eq!(
            evaluate(ScalarFunction::NullEq, &Value::Null, &Value::int64(1)).unwrap(),
            Value::bool_val(false)
        );
    }

    #[test]
    fn mixed_numeric_comparison() {
        assert_eq!(
            evaluate(ScalarFunction::Lt, &Value::int64(1), &Value::float64(1.5)).unwrap(),
            Value::bool_val(true)
        );
        assert_eq!(
            evaluate(ScalarFunction::Eq, &Value::string("2"), &Value::int64(2)).unwrap(),
            Value::bool_val(true)
        );
    }

    #[test]
    fn malformed_string_against_number_fails() {
        let err = evaluate(ScalarFunction::Eq, &Value::string("x1"), &Value::int64(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidLiteral(_)));
    }
}

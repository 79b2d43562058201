use sluice_common::error::{Error, Result};
use sluice_common::types::Value;
use sluice_ir::ScalarFunction;

pub(crate) fn evaluate(func: ScalarFunction, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if let (Value::Int64(a), Value::Int64(b)) = (left, right) {
        let exact = match func {
            ScalarFunction::Plus => a.checked_add(*b),
            ScalarFunction::Minus => a.checked_sub(*b),
            ScalarFunction::Mul => a.checked_mul(*b),
            _ => None,
        };
        if let Some(v) = exact {
            return Ok(Value::int64(v));
        }
    }

    let (Some(a), Some(b)) = (left.to_f64()?, right.to_f64()?) else {
        return Ok(Value::Null);
    };
    let result = match func {
        ScalarFunction::Plus => a + b,
        ScalarFunction::Minus => a - b,
        ScalarFunction::Mul => a * b,
        ScalarFunction::Div => {
            if b == 0.0 {
                return Ok(Value::Null);
            }
            a / b
        }
        other => {
            return Err(Error::internal(format!(
                "{} is not an arithmetic function",
                other
            )));
        }
    };
    Ok(Value::float64(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_integer() {
        assert_eq!(
            evaluate(ScalarFunction::Plus, &Value::int64(2), &Value::int64(3)).unwrap(),
            Value::int64(5)
        );
    }

    #[test]
    fn overflow_widens_to_float() {
        let v = evaluate(ScalarFunction::Plus, &Value::int64(i64::MAX), &Value::int64(1)).unwrap();
        assert!(matches!(v, Value::Float64(_)));
    }

    #[test]
    fn division_by_zero_is_null() {
        assert!(
            evaluate(ScalarFunction::Div, &Value::int64(1), &Value::int64(0))
                .unwrap()
                .is_null()
        );
    }

    #[test]
    fn null_propagates() {
        assert!(
            evaluate(ScalarFunction::Mul, &Value::Null, &Value::int64(2))
                .unwrap()
                .is_null()
        );
    }
}

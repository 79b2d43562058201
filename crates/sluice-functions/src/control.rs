use std::cmp::Ordering;

use sluice_common::error::{Error, Result};
use sluice_common::types::Value;
use sluice_ir::ScalarFunction;

use crate::comparison::compare_values;

pub(crate) fn evaluate(func: ScalarFunction, args: &[Value]) -> Result<Value> {
    match func {
        ScalarFunction::If => {
            let take_then = !args[0].is_null() && args[0].to_bool()?;
            Ok(if take_then {
                args[1].clone()
            } else {
                args[2].clone()
            })
        }
        ScalarFunction::IfNull => Ok(if args[0].is_null() {
            args[1].clone()
        } else {
            args[0].clone()
        }),
        ScalarFunction::NullIf => match compare_values(&args[0], &args[1])? {
            Some(Ordering::Equal) => Ok(Value::Null),
            _ => Ok(args[0].clone()),
        },
        ScalarFunction::Coalesce => Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null)),
        other => Err(Error::internal(format!(
            "{} is not a control function",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifnull_replaces_null() {
        assert_eq!(
            evaluate(ScalarFunction::IfNull, &[Value::Null, Value::int64(0)]).unwrap(),
            Value::int64(0)
        );
    }

    #[test]
    fn if_treats_null_condition_as_false() {
        assert_eq!(
            evaluate(
                ScalarFunction::If,
                &[Value::Null, Value::int64(1), Value::int64(2)]
            )
            .unwrap(),
            Value::int64(2)
        );
    }

    #[test]
    fn nullif_equal_is_null() {
        assert!(
            evaluate(ScalarFunction::NullIf, &[Value::int64(1), Value::int64(1)])
                .unwrap()
                .is_null()
        );
    }

    #[test]
    fn coalesce_picks_first_non_null() {
        assert_eq!(
            evaluate(
                ScalarFunction::Coalesce,
                &[Value::Null, Value::int64(7), Value::int64(8)]
            )
            .unwrap(),
            Value::int64(7)
        );
    }
}

use sluice_common::error::{Error, Result};
use sluice_common::types::Value;
use sluice_ir::ScalarFunction;

/// NULL stays NULL; anything else is coerced to a truth value.
fn truth(value: &Value) -> Result<Option<bool>> {
    if value.is_null() {
        Ok(None)
    } else {
        value.to_bool().map(Some)
    }
}

pub(crate) fn evaluate(func: ScalarFunction, args: &[Value]) -> Result<Value> {
    let result = match func {
        ScalarFunction::IsNull => Some(args[0].is_null()),
        ScalarFunction::Not => truth(&args[0])?.map(|b| !b),
        ScalarFunction::And => match (truth(&args[0])?, truth(&args[1])?) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        ScalarFunction::Or => match (truth(&args[0])?, truth(&args[1])?) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        ScalarFunction::Xor => match (truth(&args[0])?, truth(&args[1])?) {
            (Some(a), Some(b)) => Some(a != b),
            _ => None,
        },
        other => {
            return Err(Error::internal(format!("{} is not a logic function", other)));
        }
    };
    Ok(result.map(Value::bool_val).unwrap_or(Value::Null))
}

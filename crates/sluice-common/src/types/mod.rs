use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Unknown,
    Bool,
    Int64,
    Float64,
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Unknown => write!(f, "UNKNOWN"),
            DataType::Bool => write!(f, "BOOL"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::Float64 => write!(f, "FLOAT64"),
            DataType::String => write!(f, "STRING"),
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    String(String),
}

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn bool_val(v: bool) -> Self {
        Value::Bool(v)
    }

    pub fn int64(v: i64) -> Self {
        Value::Int64(v)
    }

    pub fn float64(v: f64) -> Self {
        Value::Float64(OrderedFloat(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Unknown,
            Value::Bool(_) => DataType::Bool,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::String(_) => DataType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Interprets the value as a SQL truth value.
    ///
    /// NULL is reported as `false`; callers that need three-valued logic check
    /// [`Value::is_null`] first. Strings must parse as a number, anything else
    /// is an [`Error::InvalidLiteral`].
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(v) => Ok(*v),
            Value::Int64(v) => Ok(*v != 0),
            Value::Float64(v) => Ok(v.0 != 0.0),
            Value::String(s) => parse_numeric_str(s).map(|f| f != 0.0),
        }
    }

    /// Numeric view of the value used by comparisons and arithmetic.
    /// Returns `Ok(None)` for NULL.
    pub fn to_f64(&self) -> Result<Option<f64>> {
        match self {
            Value::Null => Ok(None),
            Value::Bool(v) => Ok(Some(if *v { 1.0 } else { 0.0 })),
            Value::Int64(v) => Ok(Some(*v as f64)),
            Value::Float64(v) => Ok(Some(v.0)),
            Value::String(s) => parse_numeric_str(s).map(Some),
        }
    }
}

fn parse_numeric_str(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| Error::invalid_literal(format!("cannot interpret '{}' as a number", s)))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v.0),
            Value::String(v) => write!(f, "'{}'", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_null() {
        assert!(Value::null().is_null());
        assert!(!Value::int64(0).is_null());
        assert_eq!(Value::null().data_type(), DataType::Unknown);
    }

    #[test]
    fn to_bool_numeric() {
        assert!(Value::int64(3).to_bool().unwrap());
        assert!(!Value::int64(0).to_bool().unwrap());
        assert!(!Value::float64(0.0).to_bool().unwrap());
        assert!(Value::float64(0.5).to_bool().unwrap());
        assert!(Value::bool_val(true).to_bool().unwrap());
    }

    #[test]
    fn to_bool_string() {
        assert!(Value::string("1").to_bool().unwrap());
        assert!(!Value::string(" 0.0 ").to_bool().unwrap());
        assert!(matches!(
            Value::string("abc").to_bool(),
            Err(Error::InvalidLiteral(_))
        ));
    }

    #[test]
    fn to_f64_null_is_none() {
        assert_eq!(Value::null().to_f64().unwrap(), None);
        assert_eq!(Value::int64(7).to_f64().unwrap(), Some(7.0));
    }

    #[test]
    fn display_values() {
        assert_eq!(Value::null().to_string(), "NULL");
        assert_eq!(Value::bool_val(false).to_string(), "FALSE");
        assert_eq!(Value::string("x").to_string(), "'x'");
        assert_eq!(DataType::Int64.to_string(), "INT64");
    }
}

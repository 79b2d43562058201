use std::fmt;

use serde::{Deserialize, Serialize};
use sluice_common::types::{DataType, Value};

/// A reference to a column of some plan's output.
///
/// Identity is carried by `unique_id`; the table and name are kept for
/// display only. Two schemas that share a column (a Selection and its child,
/// a Join and its inputs) hold clones with the same `unique_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub unique_id: usize,
    pub table: Option<String>,
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(unique_id: usize, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            unique_id,
            table: None,
            name: name.into(),
            data_type,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn qualified_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    pub value: Value,
    pub data_type: DataType,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        let data_type = value.data_type();
        Self { value, data_type }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarFunction {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    NullEq,
    And,
    Or,
    Xor,
    Not,
    IsNull,
    Plus,
    Minus,
    Mul,
    Div,
    If,
    IfNull,
    NullIf,
    Coalesce,
}

impl ScalarFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Eq => "eq",
            ScalarFunction::NotEq => "ne",
            ScalarFunction::Lt => "lt",
            ScalarFunction::LtEq => "le",
            ScalarFunction::Gt => "gt",
            ScalarFunction::GtEq => "ge",
            ScalarFunction::NullEq => "nulleq",
            ScalarFunction::And => "and",
            ScalarFunction::Or => "or",
            ScalarFunction::Xor => "xor",
            ScalarFunction::Not => "not",
            ScalarFunction::IsNull => "isnull",
            ScalarFunction::Plus => "plus",
            ScalarFunction::Minus => "minus",
            ScalarFunction::Mul => "mul",
            ScalarFunction::Div => "div",
            ScalarFunction::If => "if",
            ScalarFunction::IfNull => "ifnull",
            ScalarFunction::NullIf => "nullif",
            ScalarFunction::Coalesce => "coalesce",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            ScalarFunction::Eq
                | ScalarFunction::NotEq
                | ScalarFunction::Lt
                | ScalarFunction::LtEq
                | ScalarFunction::Gt
                | ScalarFunction::GtEq
                | ScalarFunction::NullEq
        )
    }
}

impl fmt::Display for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalarFunctionExpr {
    pub func: ScalarFunction,
    pub args: Vec<Expr>,
    pub return_type: DataType,
}

/// Expression tree. Predicates are immutable values: rewriting one always
/// produces a new tree, so the same predicate can be fanned out to several
/// children without aliasing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Column(Column),
    Constant(Constant),
    ScalarFunction(ScalarFunctionExpr),
}

impl Expr {
    pub fn column(column: Column) -> Self {
        Expr::Column(column)
    }

    pub fn literal(value: Value) -> Self {
        Expr::Constant(Constant::new(value))
    }

    pub fn null() -> Self {
        Expr::Constant(Constant::null())
    }

    /// Builds a function call without folding. Use
    /// `sluice_functions::new_function` when arguments should be checked and
    /// constants evaluated.
    pub fn function(func: ScalarFunction, args: Vec<Expr>) -> Self {
        let return_type = match func {
            ScalarFunction::Plus
            | ScalarFunction::Minus
            | ScalarFunction::Mul
            | ScalarFunction::Div
            | ScalarFunction::If
            | ScalarFunction::IfNull
            | ScalarFunction::NullIf
            | ScalarFunction::Coalesce => args
                .iter()
                .map(Expr::data_type)
                .find(|t| *t != DataType::Unknown)
                .unwrap_or(DataType::Unknown),
            _ => DataType::Bool,
        };
        Expr::ScalarFunction(ScalarFunctionExpr {
            func,
            args,
            return_type,
        })
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::Eq, vec![left, right])
    }

    pub fn not_eq(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::NotEq, vec![left, right])
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::Lt, vec![left, right])
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::Gt, vec![left, right])
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::And, vec![left, right])
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::Or, vec![left, right])
    }

    pub fn not(expr: Expr) -> Self {
        Self::function(ScalarFunction::Not, vec![expr])
    }

    pub fn is_null(expr: Expr) -> Self {
        Self::function(ScalarFunction::IsNull, vec![expr])
    }

    pub fn plus(left: Expr, right: Expr) -> Self {
        Self::function(ScalarFunction::Plus, vec![left, right])
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Column(c) => c.data_type,
            Expr::Constant(c) => c.data_type,
            Expr::ScalarFunction(f) => f.return_type,
        }
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ScalarFunctionExpr> {
        match self {
            Expr::ScalarFunction(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => f.write_str(&c.qualified_name()),
            Expr::Constant(c) => write!(f, "{}", c.value),
            Expr::ScalarFunction(func) => {
                write!(f, "{}(", func.func)?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(id: usize, table: &str, name: &str) -> Expr {
        Expr::column(Column::new(id, name, DataType::Int64).with_table(table))
    }

    #[test]
    fn display_nested_function() {
        let e = Expr::and(
            Expr::eq(col(1, "t", "a"), Expr::literal(Value::int64(1))),
            Expr::is_null(col(2, "t", "b")),
        );
        assert_eq!(e.to_string(), "and(eq(t.a, 1), isnull(t.b))");
    }

    #[test]
    fn comparison_returns_bool() {
        let e = Expr::lt(col(1, "t", "a"), Expr::literal(Value::int64(10)));
        assert_eq!(e.data_type(), DataType::Bool);
    }

    #[test]
    fn arithmetic_takes_argument_type() {
        let e = Expr::plus(col(1, "t", "a"), Expr::literal(Value::int64(1)));
        assert_eq!(e.data_type(), DataType::Int64);
    }

    #[test]
    fn columns_compare_by_value() {
        let a = Column::new(3, "a", DataType::Int64);
        let b = Column::new(3, "a", DataType::Int64);
        assert_eq!(a, b);
        assert_eq!(a.qualified_name(), "a");
    }
}

use serde::{Deserialize, Serialize};

use crate::expr::{Column, Expr};

/// Ordered output columns of a plan node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSchema {
    columns: Vec<Column>,
}

impl PlanSchema {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn from_columns(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of `column` in this schema, matched by identity.
    pub fn index_of(&self, column: &Column) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.unique_id == column.unique_id)
    }

    pub fn contains(&self, column: &Column) -> bool {
        self.index_of(column).is_some()
    }

    pub fn merge(mut self, other: PlanSchema) -> Self {
        self.columns.extend(other.columns);
        self
    }

    pub fn push(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// One column-reference expression per output column.
    pub fn to_exprs(&self) -> Vec<Expr> {
        self.columns.iter().cloned().map(Expr::Column).collect()
    }
}

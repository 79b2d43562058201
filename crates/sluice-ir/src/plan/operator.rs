use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::{Column, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    Semi,
    SemiWithAux,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER"),
            JoinType::RightOuter => write!(f, "RIGHT OUTER"),
            JoinType::Semi => write!(f, "SEMI"),
            JoinType::SemiWithAux => write!(f, "SEMI WITH AUX"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub conditions: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub table_name: String,
    /// Planner's cardinality estimate, if statistics were available.
    pub row_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDual {
    pub row_count: usize,
}

/// Join payload.
///
/// `left_conditions` / `right_conditions` hold ON-clause conditions that
/// reference only one input; they wait here until push-down moves them into
/// that input. `equal_conditions` only ever holds `eq(left_col, right_col)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub join_type: JoinType,
    pub equal_conditions: Vec<Expr>,
    pub left_conditions: Vec<Expr>,
    pub right_conditions: Vec<Expr>,
    pub other_conditions: Vec<Expr>,
    /// Set on joins produced by the join-group reorderer.
    pub reordered: bool,
}

impl Join {
    pub fn new(join_type: JoinType) -> Self {
        Self {
            join_type,
            equal_conditions: Vec::new(),
            left_conditions: Vec::new(),
            right_conditions: Vec::new(),
            other_conditions: Vec::new(),
            reordered: false,
        }
    }

    /// ON conditions in the order equal, left, right, other.
    pub fn all_conditions(&self) -> Vec<Expr> {
        let mut out = Vec::with_capacity(
            self.equal_conditions.len()
                + self.left_conditions.len()
                + self.right_conditions.len()
                + self.other_conditions.len(),
        );
        out.extend(self.equal_conditions.iter().cloned());
        out.extend(self.left_conditions.iter().cloned());
        out.extend(self.right_conditions.iter().cloned());
        out.extend(self.other_conditions.iter().cloned());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    pub all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    pub func: AggregateFunction,
    pub args: Vec<Expr>,
    pub distinct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub group_by: Vec<Expr>,
    pub aggregates: Vec<AggregateCall>,
}

/// Correlated subquery application. The subquery body is owned by the
/// planner; push-down only sees the outer input as the single child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apply {
    pub correlated_columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub offset: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortItem {
    pub expr: Expr,
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub by: Vec<SortItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub table_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    ForUpdate,
    InShareMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectLock {
    pub lock: LockType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub table_name: String,
    pub assignments: Vec<(Column, Expr)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    Selection(Selection),
    DataSource(DataSource),
    TableDual(TableDual),
    Join(Join),
    Projection(Projection),
    Union(Union),
    Aggregation(Aggregation),
    Apply(Apply),
    Limit(Limit),
    Sort(Sort),
    Trim,
    MaxOneRow,
    Exists,
    Distinct,
    Insert(Insert),
    SelectLock(SelectLock),
    Update(Update),
    Delete(Delete),
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Selection(_) => "Selection",
            Operator::DataSource(_) => "DataSource",
            Operator::TableDual(_) => "TableDual",
            Operator::Join(_) => "Join",
            Operator::Projection(_) => "Projection",
            Operator::Union(_) => "Union",
            Operator::Aggregation(_) => "Aggregation",
            Operator::Apply(_) => "Apply",
            Operator::Limit(_) => "Limit",
            Operator::Sort(_) => "Sort",
            Operator::Trim => "Trim",
            Operator::MaxOneRow => "MaxOneRow",
            Operator::Exists => "Exists",
            Operator::Distinct => "Distinct",
            Operator::Insert(_) => "Insert",
            Operator::SelectLock(_) => "SelectLock",
            Operator::Update(_) => "Update",
            Operator::Delete(_) => "Delete",
        }
    }

    pub fn as_join(&self) -> Option<&Join> {
        match self {
            Operator::Join(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_join_mut(&mut self) -> Option<&mut Join> {
        match self {
            Operator::Join(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&Selection> {
        match self {
            Operator::Selection(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Operator::Join(_))
    }
}

fn write_exprs(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", e)?;
    }
    Ok(())
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Selection(s) => {
                write!(f, "Selection [")?;
                write_exprs(f, &s.conditions)?;
                write!(f, "]")
            }
            Operator::DataSource(ds) => write!(f, "DataSource {}", ds.table_name),
            Operator::TableDual(d) => write!(f, "TableDual rows={}", d.row_count),
            Operator::Join(j) => {
                write!(f, "Join {}", j.join_type)?;
                if !j.equal_conditions.is_empty() {
                    write!(f, " eq=[")?;
                    write_exprs(f, &j.equal_conditions)?;
                    write!(f, "]")?;
                }
                if !j.left_conditions.is_empty() {
                    write!(f, " left=[")?;
                    write_exprs(f, &j.left_conditions)?;
                    write!(f, "]")?;
                }
                if !j.right_conditions.is_empty() {
                    write!(f, " right=[")?;
                    write_exprs(f, &j.right_conditions)?;
                    write!(f, "]")?;
                }
                if !j.other_conditions.is_empty() {
                    write!(f, " other=[")?;
                    write_exprs(f, &j.other_conditions)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            Operator::Projection(p) => {
                write!(f, "Projection [")?;
                write_exprs(f, &p.exprs)?;
                write!(f, "]")
            }
            Operator::Union(u) => write!(f, "Union{}", if u.all { " ALL" } else { "" }),
            Operator::Aggregation(a) => {
                write!(f, "Aggregation group_by=[")?;
                write_exprs(f, &a.group_by)?;
                write!(f, "] aggs={}", a.aggregates.len())
            }
            Operator::Limit(l) => write!(f, "Limit offset={} count={}", l.offset, l.count),
            Operator::Insert(i) => write!(f, "Insert {}", i.table_name),
            Operator::Update(u) => write!(f, "Update {}", u.table_name),
            Operator::Delete(d) => write!(f, "Delete {}", d.table_name),
            other => f.write_str(other.name()),
        }
    }
}

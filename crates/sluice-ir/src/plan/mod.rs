mod operator;

use std::fmt;
use std::sync::Arc;

pub use operator::{
    AggregateCall, AggregateFunction, Aggregation, Apply, DataSource, Delete, Insert, Join,
    JoinType, Limit, LockType, Operator, Projection, SelectLock, Selection, Sort, SortItem,
    TableDual, Union, Update,
};
use sluice_common::error::{Error, Result};
use tracing::trace;

use crate::expr::Expr;
use crate::id::{IdAllocator, PlanId};
use crate::schema::PlanSchema;

/// Handle of a node inside a [`LogicalPlan`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct PlanNode {
    pub id: PlanId,
    pub op: Operator,
    pub schema: PlanSchema,
    children: Vec<NodeRef>,
    parent: Option<NodeRef>,
}

impl PlanNode {
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent
    }
}

/// A logical plan tree stored in an arena.
///
/// Children are owned by their parent through the `children` list; the
/// `parent` back-link is a plain handle kept only for splicing. Every surgery
/// method below leaves both directions consistent, which
/// [`LogicalPlan::check_links`] verifies. Nodes cut out of the tree stay in
/// the arena but are no longer reachable from the root.
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    nodes: Vec<PlanNode>,
    root: Option<NodeRef>,
    allocator: Arc<IdAllocator>,
}

impl LogicalPlan {
    pub fn new(allocator: Arc<IdAllocator>) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            allocator,
        }
    }

    pub fn allocator(&self) -> &Arc<IdAllocator> {
        &self.allocator
    }

    pub fn root(&self) -> Result<NodeRef> {
        self.root
            .ok_or_else(|| Error::invalid_plan("logical plan has no root"))
    }

    pub fn set_root(&mut self, node: NodeRef) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
        self.root = Some(node);
    }

    /// Adds a node owning `children`. Each child is re-parented to the new node.
    pub fn add_node(
        &mut self,
        op: Operator,
        schema: PlanSchema,
        children: Vec<NodeRef>,
    ) -> NodeRef {
        let node = NodeRef(self.nodes.len());
        for child in &children {
            if let Some(old_parent) = self.nodes[child.0].parent {
                self.nodes[old_parent.0].children.retain(|c| c != child);
            }
            self.nodes[child.0].parent = Some(node);
        }
        self.nodes.push(PlanNode {
            id: self.allocator.next(),
            op,
            schema,
            children,
            parent: None,
        });
        node
    }

    pub fn node(&self, node: NodeRef) -> &PlanNode {
        &self.nodes[node.0]
    }

    pub fn node_mut(&mut self, node: NodeRef) -> &mut PlanNode {
        &mut self.nodes[node.0]
    }

    pub fn op(&self, node: NodeRef) -> &Operator {
        &self.nodes[node.0].op
    }

    pub fn op_mut(&mut self, node: NodeRef) -> &mut Operator {
        &mut self.nodes[node.0].op
    }

    pub fn schema(&self, node: NodeRef) -> &PlanSchema {
        &self.nodes[node.0].schema
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        &self.nodes[node.0].children
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes[node.0].parent
    }

    pub fn child(&self, node: NodeRef, index: usize) -> Result<NodeRef> {
        self.nodes[node.0].children.get(index).copied().ok_or_else(|| {
            Error::invalid_plan(format!(
                "{} #{} has no child at position {}",
                self.op(node).name(),
                self.node(node).id,
                index
            ))
        })
    }

    /// Points `parent`'s slot holding `old` at `new`. `old` is left detached.
    pub fn replace_child(&mut self, parent: NodeRef, old: NodeRef, new: NodeRef) -> Result<()> {
        let slot = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == old)
            .ok_or_else(|| {
                Error::invalid_plan(format!(
                    "#{} is not a child of #{}",
                    self.node(old).id,
                    self.node(parent).id
                ))
            })?;
        if let Some(prev) = self.nodes[new.0].parent
            && prev != parent
        {
            self.nodes[prev.0].children.retain(|c| *c != new);
        }
        self.nodes[parent.0].children[slot] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    /// Puts `new` where `old` currently hangs: under `old`'s parent, or at the
    /// root when `old` is the root.
    pub fn replace_subtree(&mut self, old: NodeRef, new: NodeRef) -> Result<()> {
        match self.nodes[old.0].parent {
            Some(parent) => self.replace_child(parent, old, new),
            None if self.root == Some(old) => {
                self.set_root(new);
                Ok(())
            }
            None => Err(Error::invalid_plan(format!(
                "#{} is detached from the plan",
                self.node(old).id
            ))),
        }
    }

    /// Splices the childless node `new` between `parent` and its child `child`.
    pub fn insert_above(&mut self, parent: NodeRef, child: NodeRef, new: NodeRef) -> Result<()> {
        if !self.nodes[new.0].children.is_empty() {
            return Err(Error::invalid_plan(format!(
                "cannot insert #{} above #{}: it already has children",
                self.node(new).id,
                self.node(child).id
            )));
        }
        self.replace_child(parent, child, new)?;
        self.nodes[new.0].children.push(child);
        self.nodes[child.0].parent = Some(new);
        Ok(())
    }

    /// Cuts a single-child node out of the tree, reconnecting its child to the
    /// node's former parent. Returns the child.
    pub fn remove_node(&mut self, node: NodeRef) -> Result<NodeRef> {
        let child = match self.nodes[node.0].children.as_slice() {
            [child] => *child,
            other => {
                return Err(Error::invalid_plan(format!(
                    "cannot remove {} #{} with {} children",
                    self.op(node).name(),
                    self.node(node).id,
                    other.len()
                )));
            }
        };
        self.replace_subtree(node, child)?;
        self.nodes[node.0].children.clear();
        trace!(node = %self.node(node).id, child = %self.node(child).id, "removed plan node");
        Ok(child)
    }

    /// Materialises `conditions` as a new Selection between `parent` and
    /// `child`. The Selection outputs a copy of the child's schema.
    pub fn add_selection(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        conditions: Vec<Expr>,
    ) -> Result<NodeRef> {
        let schema = self.schema(child).clone();
        let selection = self.add_node(
            Operator::Selection(Selection { conditions }),
            schema,
            Vec::new(),
        );
        self.insert_above(parent, child, selection)?;
        trace!(
            selection = %self.node(selection).id,
            child = %self.node(child).id,
            "inserted selection"
        );
        Ok(selection)
    }

    /// Nodes reachable from the root, parents before children.
    pub fn walk(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeRef> = self.root.into_iter().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    /// Verifies that every reachable child points back at its parent, that the
    /// root has no parent, and that no node is reachable twice.
    pub fn check_links(&self) -> Result<()> {
        let root = self.root()?;
        if let Some(parent) = self.nodes[root.0].parent {
            return Err(Error::invalid_plan(format!(
                "root #{} has parent #{}",
                self.node(root).id,
                self.node(parent).id
            )));
        }
        let mut seen = vec![false; self.nodes.len()];
        for node in self.walk() {
            if seen[node.0] {
                return Err(Error::invalid_plan(format!(
                    "#{} is reachable more than once",
                    self.node(node).id
                )));
            }
            seen[node.0] = true;
            for child in &self.nodes[node.0].children {
                if self.nodes[child.0].parent != Some(node) {
                    return Err(Error::invalid_plan(format!(
                        "#{} does not point back at its parent #{}",
                        self.node(*child).id,
                        self.node(node).id
                    )));
                }
            }
        }
        Ok(())
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, node: NodeRef, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(depth), self.op(node))?;
        for child in self.children(node) {
            self.fmt_node(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.fmt_node(f, root, 0),
            None => writeln!(f, "<empty>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use sluice_common::types::{DataType, Value};

    use super::*;
    use crate::expr::Column;

    fn scan(plan: &mut LogicalPlan, table: &str, first_col: usize) -> NodeRef {
        let schema = PlanSchema::from_columns(vec![
            Column::new(first_col, "a", DataType::Int64).with_table(table),
        ]);
        plan.add_node(
            Operator::DataSource(DataSource {
                table_name: table.to_string(),
                row_count: None,
            }),
            schema,
            vec![],
        )
    }

    fn limit_over(plan: &mut LogicalPlan, child: NodeRef) -> NodeRef {
        let schema = plan.schema(child).clone();
        plan.add_node(
            Operator::Limit(Limit {
                offset: 0,
                count: 1,
            }),
            schema,
            vec![child],
        )
    }

    #[test]
    fn add_node_links_children() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        let limit = limit_over(&mut plan, t);
        plan.set_root(limit);

        assert_eq!(plan.parent(t), Some(limit));
        assert_eq!(plan.children(limit), &[t]);
        plan.check_links().unwrap();
    }

    #[test]
    fn add_selection_splices_between() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        let limit = limit_over(&mut plan, t);
        plan.set_root(limit);

        let cond = Expr::eq(
            Expr::column(plan.schema(t).columns()[0].clone()),
            Expr::literal(Value::int64(1)),
        );
        let sel = plan.add_selection(limit, t, vec![cond]).unwrap();

        assert_eq!(plan.children(limit), &[sel]);
        assert_eq!(plan.children(sel), &[t]);
        assert_eq!(plan.schema(sel), plan.schema(t));
        plan.check_links().unwrap();
    }

    #[test]
    fn remove_node_reconnects_child_to_parent() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        let limit = limit_over(&mut plan, t);
        plan.set_root(limit);
        let sel = plan.add_selection(limit, t, vec![]).unwrap();

        let child = plan.remove_node(sel).unwrap();
        assert_eq!(child, t);
        assert_eq!(plan.children(limit), &[t]);
        assert_eq!(plan.parent(t), Some(limit));
        assert!(plan.children(sel).is_empty());
        plan.check_links().unwrap();
    }

    #[test]
    fn remove_root_promotes_child() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        let limit = limit_over(&mut plan, t);
        plan.set_root(limit);

        plan.remove_node(limit).unwrap();
        assert_eq!(plan.root().unwrap(), t);
        assert_eq!(plan.parent(t), None);
        plan.check_links().unwrap();
    }

    #[test]
    fn remove_leaf_is_an_error() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        plan.set_root(t);
        assert!(matches!(plan.remove_node(t), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn replace_child_rejects_non_child() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        let u = scan(&mut plan, "u", 200);
        let limit = limit_over(&mut plan, t);
        plan.set_root(limit);

        let err = plan.replace_child(limit, u, t).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)));

        plan.replace_child(limit, t, u).unwrap();
        assert_eq!(plan.children(limit), &[u]);
        assert_eq!(plan.parent(t), None);
        plan.check_links().unwrap();
    }

    #[test]
    fn display_renders_indented_tree() {
        let mut plan = LogicalPlan::new(Arc::new(IdAllocator::new()));
        let t = scan(&mut plan, "t", 100);
        let limit = limit_over(&mut plan, t);
        plan.set_root(limit);
        assert_eq!(
            plan.to_string(),
            "Limit offset=0 count=1\n  DataSource t\n"
        );
    }
}

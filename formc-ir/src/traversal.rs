//! Unique post-order enumeration of expression nodes.

use formc_expr::{Expr, ExprId, Kind};
use std::collections::{HashMap, HashSet};

/// The index of a node in an [`ExprGraph`](crate::graph::ExprGraph). Indices are dense and
/// assigned in dependency order.
pub type NodeIndex = usize;

/// An insertion-ordered mapping from expression identity to node index.
///
/// The index holds a handle to every enumerated expression, which keeps their identities valid
/// for as long as the index is alive.
#[derive(Clone, Debug, Default)]
pub struct ExprIndex {
    /// The enumerated expressions, in index order.
    exprs: Vec<Expr>,

    /// The index of each enumerated expression, by identity.
    indices: HashMap<ExprId, NodeIndex>,
}

impl ExprIndex {
    /// Assigns the next index to the given expression.
    fn insert(&mut self, expr: Expr) -> NodeIndex {
        let index = self.exprs.len();
        self.indices.insert(expr.id(), index);
        self.exprs.push(expr);
        index
    }

    /// Returns the number of enumerated expressions.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Returns true if no expression was enumerated.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Returns the index of the given expression, compared by identity.
    pub fn get(&self, expr: &Expr) -> Option<NodeIndex> {
        self.indices.get(&expr.id()).copied()
    }

    /// Returns the expression at the given index.
    pub fn expr(&self, index: NodeIndex) -> Option<&Expr> {
        self.exprs.get(index)
    }

    /// Returns the enumerated expressions, in index order.
    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// Returns an iterator over the enumerated expressions and their indices, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Expr)> + '_ {
        self.exprs.iter().enumerate()
    }
}

/// An expression whose operands are being visited.
struct Frame<'a> {
    expr: &'a Expr,

    /// The position of the next operand to visit.
    next: usize,
}

/// Enumerates the unique nodes of `root`, operands before the nodes that use them.
///
/// Nodes are deduplicated by identity: a node shared by several parents is visited and indexed
/// once. Structurally equal but distinct nodes are indexed separately.
///
/// Nodes whose kind is in `skip` are traversed but not indexed; labels are never indexed. Terminals
/// are never descended into. If `opaque_modified_terminals` is set, neither are terminal
/// modifiers without free indices, which makes each such modified terminal a single node.
///
/// The traversal uses an explicit stack, so arbitrarily deep expressions can be enumerated.
pub fn unique_post_order(root: &Expr, skip: &[Kind], opaque_modified_terminals: bool) -> ExprIndex {
    let descends = |expr: &Expr| {
        !(expr.is_terminal()
            || (opaque_modified_terminals
                && expr.is_terminal_modifier()
                && expr.free_indices().is_empty()))
    };

    let mut index = ExprIndex::default();
    let mut visited = HashSet::new();
    visited.insert(root.id());
    let mut stack = vec![Frame { expr: root, next: 0 }];

    while let Some(frame) = stack.last_mut() {
        let expr = frame.expr;
        let operand = if descends(expr) { expr.operands().get(frame.next) } else { None };

        match operand {
            Some(operand) => {
                frame.next += 1;
                if visited.insert(operand.id()) {
                    stack.push(Frame { expr: operand, next: 0 });
                }
            },
            None => {
                stack.pop();
                if !expr.is_label() && !skip.contains(&expr.kind()) {
                    index.insert(expr.clone());
                }
            },
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use formc_expr::{FreeIndex, Index};
    use pretty_assertions::assert_eq;
    use super::*;

    fn rendered(index: &ExprIndex) -> Vec<String> {
        index.exprs().iter().map(|expr| expr.to_string()).collect()
    }

    #[test_log::test]
    fn shared_subexpression_is_indexed_once() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let ab = Expr::product(&a, &b).unwrap();
        let root = Expr::sum(&ab, &ab).unwrap();

        let index = unique_post_order(&root, &[], false);
        assert_eq!(rendered(&index), vec!["a", "b", "a * b", "(a * b) + (a * b)"]);
        assert_eq!(index.get(&ab), Some(2));
        assert_eq!(index.get(&root), Some(3));
    }

    #[test_log::test]
    fn equal_but_distinct_nodes_are_not_merged() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let ab1 = Expr::product(&a, &b).unwrap();
        let ab2 = Expr::product(&a, &b).unwrap();
        let root = Expr::sum(&ab1, &ab2).unwrap();

        let index = unique_post_order(&root, &[], false);
        assert_eq!(index.len(), 5);
        assert_eq!(index.get(&ab1), Some(2));
        assert_eq!(index.get(&ab2), Some(3));
    }

    #[test_log::test]
    fn enumeration_is_deterministic() {
        let i = FreeIndex(0);
        let u = Expr::coefficient("u", vec![3]);
        let ui = u.indexed(&[Index::Free(i)]).unwrap();
        let root = Expr::index_sum(&Expr::product(&ui, &ui).unwrap(), i).unwrap();

        let first = unique_post_order(&root, &[Kind::MultiIndex], false);
        let second = unique_post_order(&root, &[Kind::MultiIndex], false);
        assert_eq!(rendered(&first), rendered(&second));
        for (n, expr) in first.iter() {
            assert_eq!(second.get(expr), Some(n));
        }
    }

    #[test_log::test]
    fn operands_precede_dependents() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let root = Expr::division(
            &Expr::sum(&a, &b).unwrap(),
            &Expr::math(formc_expr::MathFunction::Sqrt, &Expr::product(&a, &a).unwrap()).unwrap(),
        ).unwrap();

        let index = unique_post_order(&root, &[], false);
        for (n, expr) in index.iter() {
            for operand in expr.operands() {
                assert!(index.get(operand).unwrap() < n);
            }
        }
    }

    #[test_log::test]
    fn skipped_kinds() {
        let t = Expr::symmetric_coefficient("T", 2);
        let t01 = t.component(&[0, 1]).unwrap();

        assert_eq!(unique_post_order(&t01, &[], false).len(), 3);
        assert_eq!(rendered(&unique_post_order(&t01, &[Kind::MultiIndex], false)), vec!["T", "T[0, 1]"]);
    }

    #[test_log::test]
    fn labels_are_never_indexed() {
        let a = Expr::coefficient("a", vec![]);
        let v = Expr::variable(&a, 7);
        let index = unique_post_order(&v, &[], false);
        assert_eq!(index.len(), 2);
        assert!(index.exprs().iter().all(|expr| !expr.is_label()));
    }

    #[test_log::test]
    fn opaque_modified_terminals() {
        let u = Expr::argument(0, vec![2]);
        let du = u.grad(2).component(&[1, 0]).unwrap();
        assert_eq!(unique_post_order(&du, &[], false).len(), 4);
        assert_eq!(rendered(&unique_post_order(&du, &[], true)), vec!["grad(v_0)[1, 0]"]);

        // free indices keep the modified terminal transparent
        let i = FreeIndex(0);
        let ui = u.indexed(&[Index::Free(i)]).unwrap();
        assert_eq!(unique_post_order(&ui, &[], true).len(), 3);
    }

    #[test_log::test]
    fn deep_expression() {
        let a = Expr::coefficient("a", vec![]);
        let mut expr = a.clone();
        for _ in 0..1000 {
            expr = Expr::sum(&expr, &a).unwrap();
        }

        let index = unique_post_order(&expr, &[], false);
        assert_eq!(index.len(), 1001);
        assert_eq!(index.get(&expr), Some(1000));
    }
}

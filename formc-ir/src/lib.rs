//! Lowers tensor-valued form expressions into graphs of scalar operations.
//!
//! Building the scalar graph of an expression runs in four stages:
//!
//! 1. The unique nodes of the expression are enumerated into an [`ExprGraph`], operands first
//!    ([`build_graph_vertices`]).
//! 2. Every scalar component of every node is assigned a [`Symbol`] by a [`ValueNumberer`].
//!    Components known to compute the same value, including symmetric components of a tensor,
//!    share a symbol.
//! 3. The expression is rebuilt from scalar subexpressions, one per symbol
//!    ([`rebuild_with_scalar_subexpressions`]).
//! 4. The scalar expression is enumerated again, treating modified terminals as single nodes,
//!    and each node is connected to its operands.
//!
//! The result of [`build_scalar_graph`] is a graph where every node computes one scalar, and
//! every operand appears before the nodes that use it.
//!
//! ```
//! use formc_expr::Expr;
//! use formc_ir::build_scalar_graph;
//!
//! let a = Expr::coefficient("a", vec![]);
//! let b = Expr::coefficient("b", vec![]);
//! let ab = Expr::product(&a, &b).unwrap();
//! let root = Expr::sum(&ab, &ab).unwrap();
//!
//! let graph = build_scalar_graph(&root).unwrap();
//! assert_eq!(graph.number_of_nodes(), 4);
//!
//! let target = graph.target().unwrap();
//! assert_eq!(graph.out_edges(target), &[2, 2]);
//! ```

pub mod error;
pub mod graph;
pub mod rebuild;
pub mod sym_table;
pub mod traversal;
pub mod value_numbering;

use error::UnknownNode;
use formc_error::Error;
use formc_expr::{Expr, Kind};
pub use graph::{build_graph_vertices, ExprGraph, NodeData};
use log::debug;
use rayon::prelude::*;
pub use rebuild::rebuild_with_scalar_subexpressions;
pub use sym_table::SymbolTable;
pub use traversal::{unique_post_order, ExprIndex, NodeIndex};
pub use value_numbering::{Symbol, ValueNumberer};

/// Returns true if the node has no dependency edges in a scalar graph.
fn is_leaf(expr: &Expr) -> bool {
    expr.is_terminal() || (expr.is_terminal_modifier() && expr.free_indices().is_empty())
}

/// Builds the scalar graph of a scalar expression.
///
/// Multi-indices are not part of the tensor graph used for value numbering. In the scalar graph,
/// modified terminals without free indices are single nodes with no edges; every other node has
/// one edge per operand, in operand order. The node of the rebuilt root is the target.
pub fn build_scalar_graph(expr: &Expr) -> Result<ExprGraph, Error> {
    let tensor_graph = build_graph_vertices(expr, &[Kind::MultiIndex], false)?;
    debug!("tensor graph of {:?} root has {} nodes", expr.kind(), tensor_graph.number_of_nodes());

    let scalar = rebuild_with_scalar_subexpressions(&tensor_graph)?;
    let mut graph = build_graph_vertices(&scalar, &[], true)?;

    let dependencies = graph.nodes()
        .map(|(node, data)| -> Result<(NodeIndex, Vec<NodeIndex>), Error> {
            if is_leaf(&data.expr) {
                return Ok((node, Vec::new()));
            }
            let operands = data.expr
                .operands()
                .iter()
                .map(|operand| {
                    graph.index()
                        .get(operand)
                        .ok_or_else(|| Error::new(operand, UnknownNode { node }))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((node, operands))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (node, operands) in dependencies {
        for operand in operands {
            graph.add_edge(node, operand)?;
        }
    }

    debug!("scalar graph of {:?} root has {} nodes", expr.kind(), graph.number_of_nodes());
    Ok(graph)
}

/// Builds the scalar graphs of independent expressions in parallel.
///
/// Each expression is compiled on its own; a failure only affects the result for that
/// expression. Results are in the order of the input.
pub fn build_scalar_graphs(exprs: &[Expr]) -> Vec<Result<ExprGraph, Error>> {
    exprs.par_iter()
        .map(build_scalar_graph)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::error::NonScalarTarget;
    use formc_expr::{ConditionKind, FreeIndex, Index, MathFunction};
    use pretty_assertions::assert_eq;
    use super::*;

    fn rendered(graph: &ExprGraph) -> Vec<String> {
        graph.nodes().map(|(_, data)| data.expr.to_string()).collect()
    }

    /// Asserts that every operand of every node was added before the node.
    fn assert_dependency_order(graph: &ExprGraph) {
        let position = |node: NodeIndex| graph.nodes().position(|(other, _)| other == node).unwrap();
        for (node, _) in graph.nodes() {
            for &operand in graph.out_edges(node) {
                assert!(position(operand) < position(node));
                assert!(graph.in_edges(operand).contains(&node));
            }
        }
    }

    #[test_log::test]
    fn shared_product() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let ab = Expr::product(&a, &b).unwrap();
        let root = Expr::sum(&ab, &ab).unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(rendered(&graph), vec!["a", "b", "a * b", "(a * b) + (a * b)"]);
        assert_eq!(graph.target(), Some(3));
        assert_eq!(graph.out_edges(2), &[0, 1]);
        assert_eq!(graph.out_edges(3), &[2, 2]);
        assert_eq!(graph.in_edges(2), &[3, 3]);
        assert!(graph.out_edges(0).is_empty());
        assert_dependency_order(&graph);
    }

    #[test_log::test]
    fn structurally_duplicated_product() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let root = Expr::sum(&Expr::product(&a, &b).unwrap(), &Expr::product(&a, &b).unwrap()).unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(graph.number_of_nodes(), 4);
        assert_eq!(graph.out_edges(3), &[2, 2]);
    }

    #[test_log::test]
    fn symmetric_tensor() {
        let t = Expr::symmetric_coefficient("T", 3);
        let root = Expr::sum(&t.component(&[2, 0]).unwrap(), &t.component(&[0, 2]).unwrap()).unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(rendered(&graph), vec!["T[0, 2]", "T[0, 2] + T[0, 2]"]);
        assert_eq!(graph.out_edges(1), &[0, 0]);
    }

    #[test_log::test]
    fn dot_product() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![2]);
        let b = Expr::coefficient("b", vec![2]);
        let ai = a.indexed(&[Index::Free(i)]).unwrap();
        let bi = b.indexed(&[Index::Free(i)]).unwrap();
        let dot = Expr::index_sum(&Expr::product(&ai, &bi).unwrap(), i).unwrap();

        let graph = build_scalar_graph(&dot).unwrap();
        assert_eq!(rendered(&graph), vec![
            "a[0]",
            "b[0]",
            "a[0] * b[0]",
            "a[1]",
            "b[1]",
            "a[1] * b[1]",
            "(a[0] * b[0]) + (a[1] * b[1])",
        ]);
        assert_eq!(graph.out_edges(6), &[2, 5]);
        assert_dependency_order(&graph);
    }

    #[test_log::test]
    fn index_sum_and_written_out_sum_share_nodes() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![3]);
        let summed = Expr::index_sum(&a.indexed(&[Index::Free(i)]).unwrap(), i).unwrap();
        let by_hand = Expr::sum(
            &Expr::sum(&a.component(&[0]).unwrap(), &a.component(&[1]).unwrap()).unwrap(),
            &a.component(&[2]).unwrap(),
        ).unwrap();
        let root = Expr::product(&summed, &by_hand).unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(rendered(&graph), vec![
            "a[0]",
            "a[1]",
            "a[0] + a[1]",
            "a[2]",
            "(a[0] + a[1]) + a[2]",
            "((a[0] + a[1]) + a[2]) * ((a[0] + a[1]) + a[2])",
        ]);
        assert_eq!(graph.out_edges(4), &[2, 3]);
        assert_eq!(graph.out_edges(5), &[4, 4]);
    }

    #[test_log::test]
    fn deep_chain() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let mut root = a.clone();
        for _ in 0..100_000 {
            root = Expr::sum(&root, &b).unwrap();
        }

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(graph.number_of_nodes(), 100_002);
        assert_eq!(graph.target(), Some(100_001));
        assert_eq!(graph.out_edges(100_001), &[100_000, 1]);
        drop(root);
        drop(graph);
    }

    #[test_log::test]
    fn component_tensor() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![2]);
        let k = Expr::coefficient("k", vec![]);
        let scaled = Expr::product(&a.indexed(&[Index::Free(i)]).unwrap(), &k).unwrap();
        let root = Expr::component_tensor(&scaled, &[i]).unwrap()
            .component(&[1])
            .unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(rendered(&graph), vec!["a[1]", "k", "a[1] * k"]);
        assert_eq!(graph.target(), Some(2));
    }

    #[test_log::test]
    fn list_tensor_and_conditional() {
        let x = Expr::coefficient("x", vec![]);
        let y = Expr::coefficient("y", vec![]);
        let v = Expr::list_tensor(vec![
            Expr::math(MathFunction::Sin, &x).unwrap(),
            Expr::math(MathFunction::Cos, &y).unwrap(),
        ]).unwrap();
        let negative = Expr::condition(ConditionKind::Lt, &x, &Expr::int(0)).unwrap();
        let root = Expr::conditional(&negative, &v, &v.abs()).unwrap()
            .component(&[1])
            .unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        assert_eq!(rendered(&graph), vec![
            "x",
            "0",
            "x < 0",
            "y",
            "cos(y)",
            "|cos(y)|",
            "(x < 0) ? cos(y) : |cos(y)|",
        ]);
        assert_dependency_order(&graph);
    }

    #[test_log::test]
    fn every_node_is_scalar() {
        let i = FreeIndex(0);
        let j = FreeIndex(1);
        let a = Expr::coefficient("A", vec![2, 2]);
        let u = Expr::argument(0, vec![2]);
        let aij = a.indexed(&[Index::Free(i), Index::Free(j)]).unwrap();
        let duj = u.grad(2).indexed(&[Index::Free(j), Index::Free(i)]).unwrap();
        let root = Expr::index_sum(&Expr::index_sum(&Expr::product(&aij, &duj).unwrap(), i).unwrap(), j).unwrap();

        let graph = build_scalar_graph(&root).unwrap();
        for (_, data) in graph.nodes() {
            assert!(data.expr.shape().is_empty(), "{}", data.expr);
            assert!(data.expr.free_indices().is_empty(), "{}", data.expr);
        }
        assert_dependency_order(&graph);
    }

    #[test_log::test]
    fn failures_are_isolated() {
        let a = Expr::coefficient("a", vec![]);
        let u = Expr::coefficient("u", vec![2]);
        let exprs = vec![
            Expr::product(&a, &a).unwrap(),
            u.clone(),
            Expr::sum(&u.component(&[0]).unwrap(), &a).unwrap(),
        ];

        let results = build_scalar_graphs(&exprs);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().number_of_nodes(), 2);
        assert!(results[1].as_ref().unwrap_err().is::<NonScalarTarget>());
        assert_eq!(results[2].as_ref().unwrap().number_of_nodes(), 3);
    }
}

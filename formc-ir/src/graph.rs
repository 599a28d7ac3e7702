//! A directed multi-edge graph of expression nodes.

use crate::{
    error::{RootExcluded, UnknownNode},
    traversal::{unique_post_order, ExprIndex, NodeIndex},
};
use formc_error::Error;
use formc_expr::{Expr, Kind};
use std::collections::HashMap;

/// The payload of a node of an [`ExprGraph`].
#[derive(Clone, Debug)]
pub struct NodeData {
    /// The expression represented by the node.
    pub expr: Expr,

    /// Whether the node is the compilation target, i.e. the root of the enumerated expression.
    pub target: bool,
}

/// A directed multi-edge graph whose nodes are expressions.
///
/// An edge from `a` to `b` means that `b` is an operand of `a`. The graph allows several edges
/// between the same pair of nodes (an operator using the same operand twice has two edges to it),
/// and preserves the insertion order of both nodes and edges.
#[derive(Clone, Debug, Default)]
pub struct ExprGraph {
    /// The nodes of the graph, in insertion order.
    order: Vec<NodeIndex>,

    nodes: HashMap<NodeIndex, NodeData>,

    /// The operands of each node.
    out_edges: HashMap<NodeIndex, Vec<NodeIndex>>,

    /// The dependents of each node.
    in_edges: HashMap<NodeIndex, Vec<NodeIndex>>,

    /// The enumeration the graph was built from.
    index: ExprIndex,
}

impl ExprGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Adds a node with no edges.
    ///
    /// Adding a node that already exists replaces its payload and clears its edges; it keeps its
    /// original position in the insertion order.
    pub fn add_node(&mut self, node: NodeIndex, data: NodeData) {
        if self.nodes.insert(node, data).is_none() {
            self.order.push(node);
        }
        self.out_edges.insert(node, Vec::new());
        self.in_edges.insert(node, Vec::new());
    }

    /// Adds an edge from `from` to its operand `to`.
    ///
    /// Both nodes must already be in the graph. If either is missing, the graph is left unchanged
    /// and an [`UnknownNode`] error is returned.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Result<(), Error> {
        for node in [from, to] {
            if !self.nodes.contains_key(&node) {
                return Err(Error::new(format!("{} -> {}", from, to), UnknownNode { node }));
            }
        }

        self.out_edges.entry(from).or_default().push(to);
        self.in_edges.entry(to).or_default().push(from);
        Ok(())
    }

    /// Returns the payload of the given node.
    pub fn node(&self, node: NodeIndex) -> Option<&NodeData> {
        self.nodes.get(&node)
    }

    /// Returns an iterator over the nodes of the graph, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &NodeData)> + '_ {
        self.order.iter().map(move |&node| (node, &self.nodes[&node]))
    }

    /// Returns the operands of the given node, in insertion order.
    pub fn out_edges(&self, node: NodeIndex) -> &[NodeIndex] {
        self.out_edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the dependents of the given node, in insertion order.
    pub fn in_edges(&self, node: NodeIndex) -> &[NodeIndex] {
        self.in_edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the first node marked as the target, if any.
    pub fn target(&self) -> Option<NodeIndex> {
        self.nodes().find(|(_, data)| data.target).map(|(node, _)| node)
    }

    /// Returns the enumeration the graph was built from. Graphs built by hand have an empty
    /// enumeration.
    pub fn index(&self) -> &ExprIndex {
        &self.index
    }
}

/// Builds a graph with one node per unique node of `expr` and no edges.
///
/// Nodes are enumerated with [`unique_post_order`] using `skip` and `opaque_modified_terminals`,
/// and added in index order. The node of `expr` itself is marked as the target.
pub fn build_graph_vertices(
    expr: &Expr,
    skip: &[Kind],
    opaque_modified_terminals: bool,
) -> Result<ExprGraph, Error> {
    let index = unique_post_order(expr, skip, opaque_modified_terminals);
    let target = index.get(expr)
        .ok_or_else(|| Error::new(expr, RootExcluded { kind: expr.op().name() }))?;

    let mut graph = ExprGraph::new();
    for (node, node_expr) in index.iter() {
        graph.add_node(node, NodeData {
            expr: node_expr.clone(),
            target: node == target,
        });
    }
    graph.index = index;

    Ok(graph)
}

//! Value numbering of scalar components.
//!
//! Every scalar component of every node of a tensor-valued [`ExprGraph`] is assigned a
//! [`Symbol`]. Two components share a symbol exactly when they are known to compute the same
//! value:
//!
//! - they are the same component of the same modified terminal, possibly accessed through a
//!   symmetry of the terminal (`T[0, 1]` and `T[1, 0]` for a symmetric `T`), or
//! - they apply the same scalar operator to operand components with the same symbols, in the
//!   same order.
//!
//! Sums over an index are numbered one step at a time, so every partial sum has a symbol of its
//! own and is shared with an equal sum written out by hand.
//!
//! Components that merely alias an operand component (indexing, list tensors, component tensors,
//! ...) reuse the symbol of that component.

use crate::{
    error::{MissingOperandComponent, UnindexedOperand, UnknownNode},
    graph::ExprGraph,
    traversal::NodeIndex,
};
use formc_error::Error;
use formc_expr::{reconstruct::ComponentRef, Expr, ScalarOp};
use log::trace;
use std::{collections::HashMap, fmt, hash::Hash};

/// A symbol, identifying one class of scalar components that compute the same value.
///
/// Symbols are dense: a [`ValueNumberer`] that created `n` symbols numbers them `0..n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub(crate) usize);

impl Symbol {
    /// Returns the number of this symbol.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Returns the symbol of `key`, creating one originating at `node` if the key is new.
fn intern<K: Hash + Eq>(
    symbols: &mut HashMap<K, Symbol>,
    origins: &mut Vec<NodeIndex>,
    key: K,
    node: NodeIndex,
) -> Symbol {
    *symbols.entry(key).or_insert_with(|| {
        origins.push(node);
        Symbol(origins.len() - 1)
    })
}

/// Returns the symbols of the operands of `expr`. Multi-indices and labels have none.
pub(crate) fn operand_symbols<'s>(
    graph: &ExprGraph,
    symbols: &'s [Vec<Symbol>],
    expr: &Expr,
) -> Result<Vec<&'s [Symbol]>, Error> {
    expr.operands()
        .iter()
        .map(|operand| {
            if operand.is_multi_index() || operand.is_label() {
                return Ok(&[][..]);
            }
            graph.index()
                .get(operand)
                .and_then(|node| symbols.get(node))
                .map(Vec::as_slice)
                .ok_or_else(|| Error::new(expr, UnindexedOperand { operand: operand.to_string() }))
        })
        .collect()
}

/// Assigns symbols to the scalar components of the nodes of a graph.
#[derive(Debug)]
pub struct ValueNumberer<'g> {
    graph: &'g ExprGraph,

    /// The node each symbol was created at, by symbol.
    origins: Vec<NodeIndex>,

    /// Symbols of modified terminal components, keyed by core and canonical component.
    terminals: HashMap<(Expr, Vec<usize>), Symbol>,

    /// Symbols of applied scalar operators, keyed by operator and operand symbols.
    applied: HashMap<(ScalarOp, Vec<Symbol>), Symbol>,
}

impl<'g> ValueNumberer<'g> {
    /// Creates a value numberer for the given graph.
    pub fn new(graph: &'g ExprGraph) -> Self {
        Self {
            graph,
            origins: Vec::new(),
            terminals: HashMap::new(),
            applied: HashMap::new(),
        }
    }

    /// Returns the number of distinct symbols created by the last call to
    /// [`ValueNumberer::compute_symbols`].
    pub fn symbol_count(&self) -> usize {
        self.origins.len()
    }

    /// Returns the node each symbol was created at, indexed by symbol.
    pub fn origins(&self) -> &[NodeIndex] {
        &self.origins
    }

    /// Returns the symbol of the scalar operator `op` applied to `args`, if one was created.
    pub fn applied_symbol(&self, op: ScalarOp, args: &[Symbol]) -> Option<Symbol> {
        self.applied.get(&(op, args.to_vec())).copied()
    }

    /// Computes the symbols of the scalar components of every node, in component order.
    ///
    /// The result is indexed by node. Nodes must have dense indices and be in dependency order,
    /// as produced by [`build_graph_vertices`](crate::graph::build_graph_vertices).
    pub fn compute_symbols(&mut self) -> Result<Vec<Vec<Symbol>>, Error> {
        self.origins.clear();
        self.terminals.clear();
        self.applied.clear();

        let graph = self.graph;
        let mut symbols = vec![Vec::new(); graph.number_of_nodes()];
        for (node, data) in graph.nodes() {
            let expr = &data.expr;
            let node_symbols = if expr.is_multi_index() || expr.is_label() {
                Vec::new()
            } else if expr.is_modified_terminal() {
                self.terminal_symbols(node, expr)?
            } else {
                self.applied_symbols(node, expr, &symbols)?
            };

            trace!("{} {:?}: {:?}", node, expr.kind(), node_symbols);
            let slot = symbols.get_mut(node)
                .ok_or_else(|| Error::new(expr, UnknownNode { node }))?;
            *slot = node_symbols;
        }

        Ok(symbols)
    }

    /// Numbers the components of a modified terminal.
    fn terminal_symbols(&mut self, node: NodeIndex, expr: &Expr) -> Result<Vec<Symbol>, Error> {
        Ok(expr.terminal_components()?
            .into_iter()
            .map(|key| intern(&mut self.terminals, &mut self.origins, key, node))
            .collect())
    }

    /// Numbers the components of an operator, following its scalar plan.
    fn applied_symbols(
        &mut self,
        node: NodeIndex,
        expr: &Expr,
        symbols: &[Vec<Symbol>],
    ) -> Result<Vec<Symbol>, Error> {
        let operands = operand_symbols(self.graph, symbols, expr)?;
        let lookup = |(operand, component): ComponentRef| {
            operands.get(operand)
                .and_then(|symbols| symbols.get(component))
                .copied()
                .ok_or_else(|| Error::new(expr, MissingOperandComponent { operand, component }))
        };

        let plan = expr.scalar_plan()?;
        let mut out = Vec::with_capacity(plan.len());
        for component in &plan {
            out.push(component.evaluate(&lookup, |op, args| {
                Ok(intern(&mut self.applied, &mut self.origins, (op, args), node))
            })?);
        }
        Ok(out)
    }
}

//! Reconstruction of a tensor-valued expression from scalar subexpressions.

use crate::{
    error::{
        ArityMismatch,
        MissingOperandComponent,
        NoTarget,
        NonScalarTarget,
        SymbolConflict,
        UnfilledSymbol,
        UnnumberedOperation,
    },
    graph::ExprGraph,
    sym_table::SymbolTable,
    traversal::NodeIndex,
    value_numbering::{operand_symbols, Symbol, ValueNumberer},
};
use formc_error::Error;
use formc_expr::{reconstruct::ComponentRef, Expr, ScalarOp};
use log::debug;
use std::collections::HashSet;

/// Stores the scalar expressions built for one node in the slots of its symbols.
///
/// Only empty slots are written. A slot that is already filled is accepted if its symbol was
/// created at an earlier node (the node recomputes a value another node already built), or if it
/// was filled by this same node (two symmetric components of a modified terminal, or a partial
/// sum). `filled_here` holds the symbols this node has filled so far. Anything else is a
/// [`SymbolConflict`].
fn store(
    table: &mut SymbolTable,
    origins: &[NodeIndex],
    node: NodeIndex,
    expr: &Expr,
    symbols: &[Symbol],
    scalars: Vec<Expr>,
    mut filled_here: HashSet<Symbol>,
) -> Result<(), Error> {
    if scalars.len() != symbols.len() {
        return Err(Error::new(expr, ArityMismatch {
            expected: symbols.len(),
            given: scalars.len(),
        }));
    }

    for (&symbol, scalar) in symbols.iter().zip(scalars) {
        if table.fill(symbol, scalar) {
            filled_here.insert(symbol);
            continue;
        }

        let earlier = origins.get(symbol.index()).map_or(false, |&origin| origin < node);
        if !earlier && !filled_here.contains(&symbol) {
            return Err(Error::new(expr, SymbolConflict { symbol: symbol.index() }));
        }
    }

    Ok(())
}

/// Rebuilds the target of a tensor-valued graph as a scalar expression, reusing one scalar
/// subexpression per symbol.
///
/// Nodes are processed in order. Modified terminals contribute their scalar components; every
/// other node reconstructs its components from the scalar expressions of its operands. Every
/// scalar operation is looked up by symbol first, so a value (including a partial sum) is built
/// once and reused everywhere. A node whose symbols are all built already is skipped.
///
/// The graph must be built from a single expression with [`build_graph_vertices`], skipping
/// multi-indices, and its target must be a scalar.
///
/// [`build_graph_vertices`]: crate::graph::build_graph_vertices
pub fn rebuild_with_scalar_subexpressions(graph: &ExprGraph) -> Result<Expr, Error> {
    let mut numberer = ValueNumberer::new(graph);
    let symbols = numberer.compute_symbols()?;
    let origins = numberer.origins();
    let mut table = SymbolTable::with_len(numberer.symbol_count());

    for (node, data) in graph.nodes() {
        let expr = &data.expr;
        let node_symbols = &symbols[node];
        if node_symbols.iter().all(|&symbol| table.is_filled(symbol)) {
            continue;
        }

        let mut filled_here = HashSet::new();
        let scalars = if expr.is_modified_terminal() {
            expr.scalar_components()?
        } else {
            let operands = operand_symbols(graph, &symbols, expr)?;
            let lookup = |(operand, component): ComponentRef| {
                operands.get(operand)
                    .and_then(|symbols| symbols.get(component))
                    .copied()
                    .ok_or_else(|| Error::new(expr, MissingOperandComponent { operand, component }))
            };

            let mut scalars = Vec::with_capacity(node_symbols.len());
            for component in expr.scalar_plan()? {
                let symbol = component.evaluate(&lookup, |op, args| {
                    build_operation(&mut table, &numberer, &mut filled_here, expr, op, &args)
                })?;
                scalars.push(filled(&table, expr, symbol)?);
            }
            scalars
        };

        store(&mut table, origins, node, expr, node_symbols, scalars, filled_here)?;
    }

    debug!(
        "rebuilt {} nodes with {} symbols ({} built)",
        graph.number_of_nodes(),
        table.len(),
        table.filled(),
    );

    let target = graph.target().ok_or_else(|| Error::new("", NoTarget))?;
    let target_expr = graph.node(target).map(|data| &data.expr);
    match symbols[target].as_slice() {
        &[symbol] => table.get(symbol)
            .cloned()
            .ok_or_else(|| Error::new(display_or_empty(target_expr), UnfilledSymbol { symbol: symbol.index() })),
        other => Err(Error::new(display_or_empty(target_expr), NonScalarTarget { symbols: other.len() })),
    }
}

/// Returns the symbol of `op` applied to `args`, building its scalar expression from the
/// expressions of the arguments if its slot is empty.
fn build_operation(
    table: &mut SymbolTable,
    numberer: &ValueNumberer,
    filled_here: &mut HashSet<Symbol>,
    expr: &Expr,
    op: ScalarOp,
    args: &[Symbol],
) -> Result<Symbol, Error> {
    let symbol = numberer.applied_symbol(op, args)
        .ok_or_else(|| Error::new(expr, UnnumberedOperation {
            op: op.name(),
            args: args.iter().map(Symbol::to_string).collect::<Vec<_>>().join(", "),
        }))?;

    if !table.is_filled(symbol) {
        let scalars = args.iter()
            .map(|&arg| filled(table, expr, arg))
            .collect::<Result<Vec<_>, _>>()?;
        if table.fill(symbol, op.apply(&scalars)?) {
            filled_here.insert(symbol);
        }
    }
    Ok(symbol)
}

/// Returns the expression stored for `symbol`.
fn filled(table: &SymbolTable, expr: &Expr, symbol: Symbol) -> Result<Expr, Error> {
    table.get(symbol)
        .cloned()
        .ok_or_else(|| Error::new(expr, UnfilledSymbol { symbol: symbol.index() }))
}

fn display_or_empty(expr: Option<&Expr>) -> String {
    expr.map(Expr::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use crate::graph::build_graph_vertices;
    use formc_expr::{FreeIndex, Index, Kind, Side};
    use pretty_assertions::assert_eq;
    use super::*;

    fn rebuild(expr: &Expr) -> Result<Expr, Error> {
        let graph = build_graph_vertices(expr, &[Kind::MultiIndex], false)?;
        rebuild_with_scalar_subexpressions(&graph)
    }

    #[test_log::test]
    fn scalar_terminal_round_trip() {
        let u = Expr::argument(0, vec![]).restricted(Side::Plus);
        let rebuilt = rebuild(&u).unwrap();
        assert_eq!(rebuilt, u);
        assert!(Expr::ptr_eq(&rebuilt, &u));
    }

    #[test_log::test]
    fn shared_product_is_built_once() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let ab1 = Expr::product(&a, &b).unwrap();
        let ab2 = Expr::product(&a, &b).unwrap();
        let root = Expr::sum(&ab1, &ab2).unwrap();

        let rebuilt = rebuild(&root).unwrap();
        assert_eq!(rebuilt.to_string(), "(a * b) + (a * b)");
        let operands = rebuilt.operands();
        assert!(Expr::ptr_eq(&operands[0], &operands[1]));
    }

    #[test_log::test]
    fn symmetric_access_is_built_once() {
        let t = Expr::symmetric_coefficient("T", 2);
        let root = Expr::product(&t.component(&[0, 1]).unwrap(), &t.component(&[1, 0]).unwrap()).unwrap();

        let rebuilt = rebuild(&root).unwrap();
        assert_eq!(rebuilt.to_string(), "T[0, 1] * T[0, 1]");
        let operands = rebuilt.operands();
        assert!(Expr::ptr_eq(&operands[0], &operands[1]));
    }

    #[test_log::test]
    fn contraction() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![3]);
        let b = Expr::coefficient("b", vec![3]);
        let ai = a.indexed(&[Index::Free(i)]).unwrap();
        let bi = b.indexed(&[Index::Free(i)]).unwrap();
        let dot = Expr::index_sum(&Expr::product(&ai, &bi).unwrap(), i).unwrap();

        let rebuilt = rebuild(&dot).unwrap();
        assert_eq!(rebuilt.to_string(), "((a[0] * b[0]) + (a[1] * b[1])) + (a[2] * b[2])");
    }

    #[test_log::test]
    fn non_scalar_target() {
        let u = Expr::coefficient("u", vec![2]);
        let err = rebuild(&Expr::sum(&u, &u).unwrap()).unwrap_err();
        assert_eq!(err.downcast_ref::<NonScalarTarget>(), Some(&NonScalarTarget { symbols: 2 }));
    }

    #[test_log::test]
    fn arity_mismatch() {
        let a = Expr::coefficient("a", vec![]);
        let mut table = SymbolTable::with_len(2);
        let err = store(&mut table, &[0, 0], 0, &a, &[Symbol(0), Symbol(1)], vec![a.clone()], HashSet::new())
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ArityMismatch>(), Some(&ArityMismatch { expected: 2, given: 1 }));
        assert_eq!(table.filled(), 0);
    }

    #[test_log::test]
    fn filled_slots() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);

        // symmetric components of the same node
        let mut table = SymbolTable::with_len(1);
        store(&mut table, &[0], 0, &a, &[Symbol(0), Symbol(0)], vec![a.clone(), b.clone()], HashSet::new())
            .unwrap();
        assert!(Expr::ptr_eq(table.get(Symbol(0)).unwrap(), &a));

        // a symbol created at an earlier node
        store(&mut table, &[0], 1, &b, &[Symbol(0)], vec![b.clone()], HashSet::new()).unwrap();
        assert!(Expr::ptr_eq(table.get(Symbol(0)).unwrap(), &a));

        // a symbol created at this node, filled by someone else
        let err = store(&mut table, &[2], 2, &b, &[Symbol(0)], vec![b.clone()], HashSet::new()).unwrap_err();
        assert_eq!(err.downcast_ref::<SymbolConflict>(), Some(&SymbolConflict { symbol: 0 }));

        // a partial value this node built before storing its components
        let partial = HashSet::from([Symbol(0)]);
        store(&mut table, &[2], 2, &b, &[Symbol(0)], vec![b], partial).unwrap();
    }

    #[test_log::test]
    fn index_sum_shares_partial_sums() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![3]);
        let summed = Expr::index_sum(&a.indexed(&[Index::Free(i)]).unwrap(), i).unwrap();
        let by_hand = Expr::sum(
            &Expr::sum(&a.component(&[0]).unwrap(), &a.component(&[1]).unwrap()).unwrap(),
            &a.component(&[2]).unwrap(),
        ).unwrap();

        let rebuilt = rebuild(&Expr::product(&summed, &by_hand).unwrap()).unwrap();
        assert_eq!(rebuilt.to_string(), "((a[0] + a[1]) + a[2]) * ((a[0] + a[1]) + a[2])");
        let operands = rebuilt.operands();
        assert!(Expr::ptr_eq(&operands[0], &operands[1]));

        // the hand-written sum first
        let rebuilt = rebuild(&Expr::product(&by_hand, &summed).unwrap()).unwrap();
        let operands = rebuilt.operands();
        assert!(Expr::ptr_eq(&operands[0], &operands[1]));
    }

    #[test_log::test]
    fn partial_sum_reused_as_a_component() {
        // component 0 sums a[0..3], component 1 sums a[0..2]; the latter is a partial of the former
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![3]);
        let b = Expr::coefficient("b", vec![2]);
        let ai = a.indexed(&[Index::Free(i)]).unwrap();
        let bi = b.indexed(&[Index::Free(i)]).unwrap();
        let head = Expr::sum(&a.component(&[0]).unwrap(), &a.component(&[1]).unwrap()).unwrap();
        let v = Expr::list_tensor(vec![Expr::index_sum(&ai, i).unwrap(), head]).unwrap();
        let root = Expr::sum(&v.component(&[0]).unwrap(), &v.component(&[1]).unwrap()).unwrap();
        let root = Expr::product(&root, &Expr::index_sum(&bi, i).unwrap()).unwrap();

        let rebuilt = rebuild(&root).unwrap();
        assert_eq!(
            rebuilt.to_string(),
            "(((a[0] + a[1]) + a[2]) + (a[0] + a[1])) * (b[0] + b[1])",
        );
        let total = &rebuilt.operands()[0];
        let partial = &total.operands()[0].operands()[0];
        assert!(Expr::ptr_eq(partial, &total.operands()[1]));
    }
}

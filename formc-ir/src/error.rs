use ariadne::Fmt;
use formc_attrs::ErrorKind;
use formc_error::EXPR;

/// An edge was added to a node that is not in the graph.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("cannot add an edge to unknown node #{}", self.node),
    labels = ["this edge"],
    help = "add both endpoints with `add_node` before connecting them",
)]
pub struct UnknownNode {
    /// The index of the missing node.
    pub node: usize,
}

/// The root of an expression is of a kind excluded from enumeration.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("the root expression is a `{}` node, which is excluded from the graph", self.kind),
    labels = ["this expression"],
)]
pub struct RootExcluded {
    /// The kind of the root.
    pub kind: &'static str,
}

/// The graph has no target node.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(message = "the expression graph has no target node", labels = [""])]
pub struct NoTarget;

/// An operand of a node was never assigned a node index.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("operand `{}` is not a node of the graph", (&self.operand).fg(EXPR)),
    labels = ["while numbering this expression"],
    help = "build the graph with `build_graph_vertices` so every operand is enumerated",
)]
pub struct UnindexedOperand {
    /// The rendering of the operand.
    pub operand: String,
}

/// The scalar plan of a node references an operand component that has no symbol.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("operand #{} has no symbol for component #{}", self.operand, self.component),
    labels = ["while numbering this expression"],
)]
pub struct MissingOperandComponent {
    /// The position of the operand.
    pub operand: usize,

    /// The position of the component.
    pub component: usize,
}

/// The number of scalar expressions built for a node is not its number of symbols.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("expected {} scalar expressions, but {} were built", self.expected, self.given),
    labels = ["while rebuilding this expression"],
    note = "every scalar component of a node must map to exactly one symbol",
)]
pub struct ArityMismatch {
    /// The number of symbols of the node.
    pub expected: usize,

    /// The number of scalar expressions built.
    pub given: usize,
}

/// A filled slot of the symbol table was written again without being an alias.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("symbol s{} was already built", self.symbol),
    labels = ["while rebuilding this expression"],
    note = "a symbol may only be built again by a symmetric component of the same node",
)]
pub struct SymbolConflict {
    /// The symbol whose slot was overwritten.
    pub symbol: usize,
}

/// The target of the graph is not a single scalar.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("the target expression has {} scalar components, but must have exactly one", self.symbols),
    labels = ["this expression"],
    help = "index the expression down to a scalar before building its scalar graph",
)]
pub struct NonScalarTarget {
    /// The number of symbols of the target.
    pub symbols: usize,
}

/// A symbol was read before any node built its scalar expression.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("symbol s{} was used before it was built", self.symbol),
    labels = ["while rebuilding this expression"],
)]
pub struct UnfilledSymbol {
    /// The symbol that was read.
    pub symbol: usize,
}

/// A scalar operation reached during reconstruction was never assigned a symbol.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("no symbol was assigned to `{}` applied to ({})", self.op, self.args),
    labels = ["while rebuilding this expression"],
    help = "rebuild with the same value numberer that numbered the graph",
)]
pub struct UnnumberedOperation {
    /// The scalar operator.
    pub op: &'static str,

    /// The symbols of the arguments.
    pub args: String,
}

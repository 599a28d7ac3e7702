//! Errors raised when an expression violates the structural contract of its operator.

use ariadne::Fmt;
use formc_attrs::ErrorKind;
use formc_error::EXPR;

/// Two operands that must have the same shape do not.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("operands of `{}` have different shapes", self.op),
    labels = [format!("shapes are {:?} and {:?}", self.lhs, self.rhs)],
)]
pub struct ShapeMismatch {
    /// The operator that was applied.
    pub op: &'static str,

    /// The shape of the first operand.
    pub lhs: Vec<usize>,

    /// The shape of the second operand.
    pub rhs: Vec<usize>,
}

/// An operator that only accepts scalars was given a tensor.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("`{}` expects a scalar operand", self.op),
    labels = [format!("this operand has shape {:?}", self.shape)],
    help = "index the operand down to a scalar, or wrap it in a component tensor afterwards",
)]
pub struct NonScalarOperand {
    /// The operator that was applied.
    pub op: &'static str,

    /// The shape of the operand.
    pub shape: Vec<usize>,
}

/// A fixed index is outside of the axis it indexes.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("index {} is out of bounds for axis {} of dimension {}", self.index, self.axis, self.dim),
    labels = ["this expression"],
)]
pub struct IndexOutOfBounds {
    /// The index that was given.
    pub index: usize,

    /// The axis that was indexed.
    pub axis: usize,

    /// The dimension of the axis.
    pub dim: usize,
}

/// A multi-index does not have one entry per axis of the indexed tensor.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("expected {} indices, but {} were given", self.rank, self.given),
    labels = ["this expression"],
    help = "a tensor must be indexed on every axis at once",
)]
pub struct RankMismatch {
    /// The rank of the indexed tensor.
    pub rank: usize,

    /// The number of indices given.
    pub given: usize,
}

/// The same free index appears more than once where it cannot be merged.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("free index `{}` is repeated", (&self.index).fg(EXPR)),
    labels = ["this expression"],
    help = "contract repeated indices with an explicit index sum",
)]
pub struct RepeatedIndex {
    /// The rendering of the repeated index.
    pub index: String,
}

/// A free index is summed or bound, but is not free in the operand.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("index `{}` is not free in the operand", (&self.index).fg(EXPR)),
    labels = ["this expression"],
)]
pub struct UnboundIndex {
    /// The rendering of the index.
    pub index: String,
}

/// Two operands that must have the same free indices do not.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("operands of `{}` have different free indices", self.op),
    labels = [format!("free indices are ({}) and ({})", self.lhs, self.rhs)],
)]
pub struct FreeIndexMismatch {
    /// The operator that was applied.
    pub op: &'static str,

    /// The free indices of the first operand.
    pub lhs: String,

    /// The free indices of the second operand.
    pub rhs: String,
}

/// A list tensor was built without items.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(message = "cannot build a list tensor without items", labels = [""])]
pub struct EmptyListTensor;

/// An indexing modifier appears below another terminal modifier.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = "indexing must be the outermost terminal modifier",
    labels = ["this modified terminal"],
    help = "propagate derivatives and restrictions to the terminal before indexing",
)]
pub struct MisplacedIndexing;

/// A modifier is applied to something other than a modified terminal.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("`{}` can only be applied to a terminal", self.op),
    labels = ["this expression"],
    help = "apply derivatives and restrictions to terminals before lowering",
)]
pub struct NotModifiedTerminal {
    /// The modifier that was applied.
    pub op: &'static str,
}

/// The expression has no scalar reconstruction rule.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("`{}` nodes have no scalar reconstruction rule", self.op),
    labels = ["this expression"],
)]
pub struct NoScalarPlan {
    /// The kind of the expression.
    pub op: &'static str,
}

/// An operand did not supply the scalar component the reconstruction rule needs.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("operand #{} has no scalar component #{}", self.operand, self.component),
    labels = ["while reconstructing this expression"],
)]
pub struct MissingComponent {
    /// The position of the operand.
    pub operand: usize,

    /// The position of the missing component.
    pub component: usize,
}

/// A scalar operator was applied to the wrong number of scalars.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("`{}` expects {} scalar operands, but {} were given", self.op, self.expected, self.given),
    labels = ["these operands"],
)]
pub struct ScalarArity {
    /// The scalar operator.
    pub op: &'static str,

    /// The number of operands expected.
    pub expected: usize,

    /// The number of operands given.
    pub given: usize,
}

/// A floating-point literal is not a finite number.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("`{}` is not a finite number", self.value),
    labels = ["this literal"],
)]
pub struct NonFiniteLiteral {
    /// The rendering of the value.
    pub value: String,
}

/// A unary connective was given two operands.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("`{}` takes a single operand", self.op),
    labels = ["these operands"],
    help = "build negations with `Expr::not`",
)]
pub struct UnaryConnective {
    /// The connective.
    pub op: &'static str,
}

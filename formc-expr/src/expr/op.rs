use crate::{index::Index, terminal::Terminal};
use std::fmt;

/// An elementary math function of one scalar argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Erf,
}

impl MathFunction {
    /// Returns the name of the function.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Erf => "erf",
        }
    }
}

/// A boolean-valued comparison or connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

impl ConditionKind {
    /// Returns the symbol of the condition.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
        }
    }
}

/// The side of an interior facet a restricted value is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Plus,
    Minus,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
        }
    }
}

/// The operator of an expression node, with any parameters that are not operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// A terminal value.
    Terminal(Terminal),

    /// A multi-index used by indexing, index sums and component tensors. Carries no value.
    MultiIndex(Vec<Index>),

    /// A label naming a [`Op::Variable`]. Carries no value.
    Label(usize),

    /// `A[mi]`: operands are the indexed tensor and a multi-index.
    Indexed,

    /// The spatial gradient in the given geometric dimension.
    Grad(usize),

    /// The value restricted to one side of an interior facet.
    Restricted(Side),

    /// The reference-cell value of a mapped function.
    ReferenceValue,

    /// The cell average of a value.
    CellAvg,

    /// The facet average of a value.
    FacetAvg,

    Sum,
    Product,
    Division,
    Power,
    Math(MathFunction),
    Abs,
    Conj,
    Real,
    Imag,
    Condition(ConditionKind),

    /// `c ? t : f`: operands are the condition and both branches.
    Conditional,

    /// Sum over one free index: operands are the summand and a one-entry multi-index.
    IndexSum,

    /// Binds free indices of a scalar as tensor axes: operands are the scalar and a multi-index.
    ComponentTensor,

    /// A tensor whose first axis lists the operands.
    ListTensor,

    /// A labeled expression: operands are the expression and its label.
    Variable,
}

/// The tag of an [`Op`], without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Terminal,
    MultiIndex,
    Label,
    Indexed,
    Grad,
    Restricted,
    ReferenceValue,
    CellAvg,
    FacetAvg,
    Sum,
    Product,
    Division,
    Power,
    Math,
    Abs,
    Conj,
    Real,
    Imag,
    Condition,
    Conditional,
    IndexSum,
    ComponentTensor,
    ListTensor,
    Variable,
}

impl Op {
    /// Returns the tag of this operator.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Terminal(_) => Kind::Terminal,
            Self::MultiIndex(_) => Kind::MultiIndex,
            Self::Label(_) => Kind::Label,
            Self::Indexed => Kind::Indexed,
            Self::Grad(_) => Kind::Grad,
            Self::Restricted(_) => Kind::Restricted,
            Self::ReferenceValue => Kind::ReferenceValue,
            Self::CellAvg => Kind::CellAvg,
            Self::FacetAvg => Kind::FacetAvg,
            Self::Sum => Kind::Sum,
            Self::Product => Kind::Product,
            Self::Division => Kind::Division,
            Self::Power => Kind::Power,
            Self::Math(_) => Kind::Math,
            Self::Abs => Kind::Abs,
            Self::Conj => Kind::Conj,
            Self::Real => Kind::Real,
            Self::Imag => Kind::Imag,
            Self::Condition(_) => Kind::Condition,
            Self::Conditional => Kind::Conditional,
            Self::IndexSum => Kind::IndexSum,
            Self::ComponentTensor => Kind::ComponentTensor,
            Self::ListTensor => Kind::ListTensor,
            Self::Variable => Kind::Variable,
        }
    }

    /// Returns a short name of the operator, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Terminal(_) => "terminal",
            Self::MultiIndex(_) => "multi-index",
            Self::Label(_) => "label",
            Self::Indexed => "[]",
            Self::Grad(_) => "grad",
            Self::Restricted(_) => "restricted",
            Self::ReferenceValue => "reference_value",
            Self::CellAvg => "cell_avg",
            Self::FacetAvg => "facet_avg",
            Self::Sum => "+",
            Self::Product => "*",
            Self::Division => "/",
            Self::Power => "^",
            Self::Math(func) => func.name(),
            Self::Abs => "abs",
            Self::Conj => "conj",
            Self::Real => "real",
            Self::Imag => "imag",
            Self::Condition(kind) => kind.symbol(),
            Self::Conditional => "?:",
            Self::IndexSum => "index_sum",
            Self::ComponentTensor => "as_tensor",
            Self::ListTensor => "list_tensor",
            Self::Variable => "variable",
        }
    }

    /// Returns true if the operator is a terminal modifier: a wrapper around a terminal that does
    /// not branch.
    pub fn is_terminal_modifier(&self) -> bool {
        matches!(
            self,
            Self::Indexed
                | Self::Grad(_)
                | Self::Restricted(_)
                | Self::ReferenceValue
                | Self::CellAvg
                | Self::FacetAvg
        )
    }
}

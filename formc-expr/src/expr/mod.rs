//! A representation of tensor-valued form expressions.
//!
//! An [`Expr`] is an immutable, reference-counted handle to a [`Node`]. Nodes are shared freely:
//! building `a * b` once and using it twice produces a tree with aliasing, which behaves like a
//! DAG. Two notions of sameness exist for expressions:
//!
//! # Identity
//!
//! Two handles are **identical** if they point to the same node. Cloning a handle preserves
//! identity; building a structurally equal expression a second time does not. Identity is
//! exposed through [`Expr::id`] and is what graph construction uses to deduplicate nodes.
//!
//! # Structural equality
//!
//! The [`PartialEq`], [`Eq`] and [`Hash`] implementations for [`Expr`] compare **structure**:
//! operator, operands, shape and free indices. Every node caches its structural hash when it is
//! built, so hashing an expression is constant time regardless of its size. The hash is computed
//! with a fixed-key hasher and is therefore the same for every run of the program.
//!
//! Structural equality is used to recognize that two accesses of a terminal denote the same value
//! (for example through a symmetry of the terminal), never to deduplicate graph nodes.
//!
//! # Components
//!
//! An expression with shape `S` and free indices `F` denotes `|S| * |F|` scalar values. They are
//! always enumerated shape-component major (row-major over `S`), then by free-index assignment
//! (row-major over the dimensions of `F`, in index order).

mod op;

pub use op::{ConditionKind, Kind, MathFunction, Op, Side};

use crate::{
    error::{
        EmptyListTensor,
        FreeIndexMismatch,
        IndexOutOfBounds,
        NonFiniteLiteral,
        NonScalarOperand,
        RankMismatch,
        RepeatedIndex,
        ShapeMismatch,
        UnaryConnective,
        UnboundIndex,
    },
    index::{component_count, free_dims, merge_free, FreeIndex, FreeIndices, Index},
    primitive::{float, int},
    symmetry::Symmetry,
    terminal::{Primary, Terminal},
};
use formc_error::Error;
use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A single node of an expression.
#[derive(Debug)]
pub struct Node {
    op: Op,
    operands: Vec<Expr>,
    shape: Vec<usize>,
    free_indices: FreeIndices,
    hash: u64,
}

/// Releases the operands of a node without recursing, so that arbitrarily deep expressions can
/// be dropped.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.operands);
        while let Some(Expr(node)) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(node) {
                pending.append(&mut node.operands);
            }
        }
    }
}

/// The identity of an expression node. Valid for as long as the node is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

/// A handle to an immutable expression node.
///
/// For more information about this type, see the [module-level documentation](self).
#[derive(Clone)]
pub struct Expr(Arc<Node>);

impl Expr {
    /// Creates a new node. Callers are responsible for validating shape and free indices.
    fn new(op: Op, operands: Vec<Expr>, shape: Vec<usize>, free_indices: FreeIndices) -> Self {
        let mut hasher = DefaultHasher::new();
        op.hash(&mut hasher);
        for operand in &operands {
            operand.0.hash.hash(&mut hasher);
        }
        shape.hash(&mut hasher);
        free_indices.hash(&mut hasher);

        Self(Arc::new(Node {
            op,
            operands,
            shape,
            free_indices,
            hash: hasher.finish(),
        }))
    }

    /// Creates a terminal expression.
    pub fn terminal(terminal: Terminal) -> Self {
        let shape = terminal.shape().to_vec();
        Self::new(Op::Terminal(terminal), Vec::new(), shape, Vec::new())
    }

    /// Creates an integer literal.
    pub fn int(n: i64) -> Self {
        Self::terminal(Terminal::Literal(Primary::Integer(int(n))))
    }

    /// Creates a floating-point literal. The value must be finite; negative zero is stored as
    /// zero.
    pub fn float(x: f64) -> Result<Self, Error> {
        if !x.is_finite() {
            return Err(Error::new(x, NonFiniteLiteral { value: x.to_string() }));
        }
        let x = if x == 0.0 { 0.0 } else { x };
        Ok(Self::terminal(Terminal::Literal(Primary::Float(float(x)))))
    }

    /// Creates a tensor of zeros.
    pub fn zero(shape: Vec<usize>) -> Self {
        Self::terminal(Terminal::Zero(shape))
    }

    /// Creates a coefficient without symmetries.
    pub fn coefficient(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self::coefficient_with_symmetry(name, shape, Symmetry::new())
    }

    /// Creates a symmetric `dim` by `dim` coefficient.
    pub fn symmetric_coefficient(name: impl Into<String>, dim: usize) -> Self {
        Self::coefficient_with_symmetry(name, vec![dim, dim], Symmetry::symmetric(dim))
    }

    /// Creates a coefficient with the given component symmetry.
    pub fn coefficient_with_symmetry(
        name: impl Into<String>,
        shape: Vec<usize>,
        symmetry: Symmetry,
    ) -> Self {
        Self::terminal(Terminal::Coefficient { name: name.into(), shape, symmetry })
    }

    /// Creates a test or trial function.
    pub fn argument(number: usize, shape: Vec<usize>) -> Self {
        Self::terminal(Terminal::Argument { number, shape })
    }

    /// Creates a geometric quantity.
    pub fn geometric(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self::terminal(Terminal::Geometric { name: name.into(), shape })
    }

    /// Creates a multi-index.
    pub fn multi_index(indices: Vec<Index>) -> Self {
        Self::new(Op::MultiIndex(indices), Vec::new(), Vec::new(), Vec::new())
    }

    /// Creates a label.
    pub fn label(id: usize) -> Self {
        Self::new(Op::Label(id), Vec::new(), Vec::new(), Vec::new())
    }

    /// Indexes every axis of this expression. Free indices in `indices` become free indices of
    /// the result, with the dimension of the axis they index.
    ///
    /// Indexing a scalar with no indices returns the scalar itself.
    pub fn indexed(&self, indices: &[Index]) -> Result<Self, Error> {
        if indices.len() != self.rank() {
            return Err(Error::new(self, RankMismatch { rank: self.rank(), given: indices.len() }));
        }
        if indices.is_empty() {
            return Ok(self.clone());
        }

        let mut free = self.free_indices().to_vec();
        for (axis, (index, &dim)) in indices.iter().zip(self.shape()).enumerate() {
            match *index {
                Index::Fixed(n) if n >= dim => {
                    return Err(Error::new(self, IndexOutOfBounds { index: n, axis, dim }));
                },
                Index::Fixed(_) => {},
                Index::Free(i) => {
                    if free.iter().any(|&(other, _)| other == i) {
                        return Err(Error::new(self, RepeatedIndex { index: i.to_string() }));
                    }
                    free.push((i, dim));
                },
            }
        }
        free.sort();

        Ok(Self::new(
            Op::Indexed,
            vec![self.clone(), Self::multi_index(indices.to_vec())],
            Vec::new(),
            free,
        ))
    }

    /// Extracts the scalar component at the given fixed multi-index.
    pub fn component(&self, component: &[usize]) -> Result<Self, Error> {
        let indices = component.iter().copied().map(Index::Fixed).collect::<Vec<_>>();
        self.indexed(&indices)
    }

    /// Returns the spatial gradient of this expression in `dim` dimensions.
    pub fn grad(&self, dim: usize) -> Self {
        let mut shape = self.shape().to_vec();
        shape.push(dim);
        self.wrap(Op::Grad(dim), shape)
    }

    /// Restricts this expression to one side of an interior facet.
    pub fn restricted(&self, side: Side) -> Self {
        self.wrap(Op::Restricted(side), self.shape().to_vec())
    }

    /// Returns the reference-cell value of this expression.
    pub fn reference_value(&self) -> Self {
        self.wrap(Op::ReferenceValue, self.shape().to_vec())
    }

    /// Returns the cell average of this expression.
    pub fn cell_avg(&self) -> Self {
        self.wrap(Op::CellAvg, self.shape().to_vec())
    }

    /// Returns the facet average of this expression.
    pub fn facet_avg(&self) -> Self {
        self.wrap(Op::FacetAvg, self.shape().to_vec())
    }

    /// Wraps this expression in a unary operator that keeps its free indices.
    fn wrap(&self, op: Op, shape: Vec<usize>) -> Self {
        Self::new(op, vec![self.clone()], shape, self.free_indices().to_vec())
    }

    /// Returns `lhs + rhs`. Both operands must have the same shape and free indices.
    pub fn sum(lhs: &Self, rhs: &Self) -> Result<Self, Error> {
        check_same_shape("+", lhs, rhs)?;
        check_same_free("+", lhs, rhs)?;
        Ok(Self::new(
            Op::Sum,
            vec![lhs.clone(), rhs.clone()],
            lhs.shape().to_vec(),
            lhs.free_indices().to_vec(),
        ))
    }

    /// Returns `lhs * rhs` for scalar operands. Free indices shared by both operands take the
    /// same value in both; they are not summed.
    pub fn product(lhs: &Self, rhs: &Self) -> Result<Self, Error> {
        Self::scalar_binary(Op::Product, lhs, rhs)
    }

    /// Returns `lhs / rhs` for scalar operands.
    pub fn division(lhs: &Self, rhs: &Self) -> Result<Self, Error> {
        Self::scalar_binary(Op::Division, lhs, rhs)
    }

    /// Returns `base ^ exponent` for scalar operands.
    pub fn power(base: &Self, exponent: &Self) -> Result<Self, Error> {
        Self::scalar_binary(Op::Power, base, exponent)
    }

    /// Returns the comparison or connective `lhs <kind> rhs` for scalar operands. Negations are
    /// built with [`Expr::not`].
    pub fn condition(kind: ConditionKind, lhs: &Self, rhs: &Self) -> Result<Self, Error> {
        if kind == ConditionKind::Not {
            return Err(Error::new(format!("{}, {}", lhs, rhs), UnaryConnective { op: kind.symbol() }));
        }
        Self::scalar_binary(Op::Condition(kind), lhs, rhs)
    }

    /// Returns the negation of a scalar condition.
    pub fn not(condition: &Self) -> Result<Self, Error> {
        let op = Op::Condition(ConditionKind::Not);
        check_scalar(&op, condition)?;
        Ok(Self::new(op, vec![condition.clone()], Vec::new(), condition.free_indices().to_vec()))
    }

    /// Applies a math function to a scalar.
    pub fn math(func: MathFunction, arg: &Self) -> Result<Self, Error> {
        let op = Op::Math(func);
        check_scalar(&op, arg)?;
        Ok(Self::new(op, vec![arg.clone()], Vec::new(), arg.free_indices().to_vec()))
    }

    /// Returns the component-wise absolute value.
    pub fn abs(&self) -> Self {
        self.wrap(Op::Abs, self.shape().to_vec())
    }

    /// Returns the component-wise complex conjugate.
    pub fn conj(&self) -> Self {
        self.wrap(Op::Conj, self.shape().to_vec())
    }

    /// Returns the component-wise real part.
    pub fn real(&self) -> Self {
        self.wrap(Op::Real, self.shape().to_vec())
    }

    /// Returns the component-wise imaginary part.
    pub fn imag(&self) -> Self {
        self.wrap(Op::Imag, self.shape().to_vec())
    }

    /// Returns `condition ? if_true : if_false`. The condition must be scalar; both branches
    /// must have the same shape and free indices.
    pub fn conditional(condition: &Self, if_true: &Self, if_false: &Self) -> Result<Self, Error> {
        check_scalar(&Op::Conditional, condition)?;
        check_same_shape("?:", if_true, if_false)?;
        check_same_free("?:", if_true, if_false)?;
        let free = merge_free(condition.free_indices(), if_true.free_indices())
            .map_err(|_| free_mismatch("?:", condition, if_true))?;
        Ok(Self::new(
            Op::Conditional,
            vec![condition.clone(), if_true.clone(), if_false.clone()],
            if_true.shape().to_vec(),
            free,
        ))
    }

    /// Sums `summand` over all values of the free index `index`.
    pub fn index_sum(summand: &Self, index: FreeIndex) -> Result<Self, Error> {
        if summand.free_dim(index).is_none() {
            return Err(Error::new(summand, UnboundIndex { index: index.to_string() }));
        }
        let free = summand.free_indices()
            .iter()
            .copied()
            .filter(|&(other, _)| other != index)
            .collect();
        Ok(Self::new(
            Op::IndexSum,
            vec![summand.clone(), Self::multi_index(vec![Index::Free(index)])],
            summand.shape().to_vec(),
            free,
        ))
    }

    /// Binds the given free indices of a scalar as the axes of a tensor, in order.
    ///
    /// Binding no indices returns the scalar itself.
    pub fn component_tensor(expr: &Self, indices: &[FreeIndex]) -> Result<Self, Error> {
        check_scalar(&Op::ComponentTensor, expr)?;
        if indices.is_empty() {
            return Ok(expr.clone());
        }

        let mut shape = Vec::with_capacity(indices.len());
        for (n, &index) in indices.iter().enumerate() {
            if indices[..n].contains(&index) {
                return Err(Error::new(expr, RepeatedIndex { index: index.to_string() }));
            }
            match expr.free_dim(index) {
                Some(dim) => shape.push(dim),
                None => return Err(Error::new(expr, UnboundIndex { index: index.to_string() })),
            }
        }
        let free = expr.free_indices()
            .iter()
            .copied()
            .filter(|(other, _)| !indices.contains(other))
            .collect();

        Ok(Self::new(
            Op::ComponentTensor,
            vec![expr.clone(), Self::multi_index(indices.iter().copied().map(Index::Free).collect())],
            shape,
            free,
        ))
    }

    /// Creates a tensor whose first axis lists the given items. All items must have the same
    /// shape and free indices.
    pub fn list_tensor(items: Vec<Self>) -> Result<Self, Error> {
        let first = items.first().ok_or_else(|| Error::new("[]", EmptyListTensor))?;
        for item in &items[1..] {
            check_same_shape("list_tensor", first, item)?;
            check_same_free("list_tensor", first, item)?;
        }

        let mut shape = vec![items.len()];
        shape.extend_from_slice(first.shape());
        let free = first.free_indices().to_vec();
        Ok(Self::new(Op::ListTensor, items, shape, free))
    }

    /// Labels an expression.
    pub fn variable(expr: &Self, label: usize) -> Self {
        Self::new(
            Op::Variable,
            vec![expr.clone(), Self::label(label)],
            expr.shape().to_vec(),
            expr.free_indices().to_vec(),
        )
    }

    /// Builds a binary operator over scalar operands, merging their free indices.
    fn scalar_binary(op: Op, lhs: &Self, rhs: &Self) -> Result<Self, Error> {
        check_scalar(&op, lhs)?;
        check_scalar(&op, rhs)?;
        let free = merge_free(lhs.free_indices(), rhs.free_indices())
            .map_err(|_| free_mismatch(op.name(), lhs, rhs))?;
        Ok(Self::new(op, vec![lhs.clone(), rhs.clone()], Vec::new(), free))
    }

    /// Returns the operator of this expression.
    pub fn op(&self) -> &Op {
        &self.0.op
    }

    /// Returns the tag of the operator of this expression.
    pub fn kind(&self) -> Kind {
        self.0.op.kind()
    }

    /// Returns the operands of this expression, in order.
    pub fn operands(&self) -> &[Expr] {
        &self.0.operands
    }

    /// Returns the tensor shape of this expression. Scalars have an empty shape.
    pub fn shape(&self) -> &[usize] {
        &self.0.shape
    }

    /// Returns the number of axes of this expression.
    pub fn rank(&self) -> usize {
        self.0.shape.len()
    }

    /// Returns the free indices of this expression and their dimensions, sorted by index.
    pub fn free_indices(&self) -> &[(FreeIndex, usize)] {
        &self.0.free_indices
    }

    /// Returns the dimension of the given free index, if it is free in this expression.
    pub fn free_dim(&self, index: FreeIndex) -> Option<usize> {
        self.0.free_indices
            .iter()
            .find(|&&(other, _)| other == index)
            .map(|&(_, dim)| dim)
    }

    /// Returns the number of scalar values this expression denotes. Multi-indices and labels
    /// denote none.
    pub fn value_count(&self) -> usize {
        if self.is_multi_index() || self.is_label() {
            return 0;
        }
        component_count(self.shape()) * component_count(&free_dims(self.free_indices()))
    }

    /// Returns the identity of this expression node.
    pub fn id(&self) -> ExprId {
        ExprId(Arc::as_ptr(&self.0) as usize)
    }

    /// Returns true if both handles point to the same node.
    pub fn ptr_eq(lhs: &Self, rhs: &Self) -> bool {
        Arc::ptr_eq(&lhs.0, &rhs.0)
    }

    /// Returns the terminal value, if this expression is a terminal value.
    pub fn as_terminal(&self) -> Option<&Terminal> {
        match &self.0.op {
            Op::Terminal(terminal) => Some(terminal),
            _ => None,
        }
    }

    /// Returns the entries of this multi-index, if this expression is a multi-index.
    pub fn as_multi_index(&self) -> Option<&[Index]> {
        match &self.0.op {
            Op::MultiIndex(indices) => Some(indices),
            _ => None,
        }
    }

    /// Returns true if this expression has no operands by nature: a terminal value, a
    /// multi-index or a label.
    pub fn is_terminal(&self) -> bool {
        matches!(self.0.op, Op::Terminal(_) | Op::MultiIndex(_) | Op::Label(_))
    }

    /// Returns true if this expression is a terminal modifier.
    pub fn is_terminal_modifier(&self) -> bool {
        self.0.op.is_terminal_modifier()
    }

    /// Returns true if this expression is a multi-index.
    pub fn is_multi_index(&self) -> bool {
        matches!(self.0.op, Op::MultiIndex(_))
    }

    /// Returns true if this expression is a label.
    pub fn is_label(&self) -> bool {
        matches!(self.0.op, Op::Label(_))
    }

    /// Returns true if this expression is a terminal value wrapped in zero or more terminal
    /// modifiers.
    pub fn is_modified_terminal(&self) -> bool {
        let mut expr = self;
        loop {
            match &expr.0.op {
                Op::Terminal(_) => return true,
                op if op.is_terminal_modifier() => expr = &expr.0.operands[0],
                _ => return false,
            }
        }
    }

    /// Returns true if this operand should be wrapped in parentheses when printed inside another
    /// operator.
    fn needs_parens(&self) -> bool {
        matches!(
            self.0.op,
            Op::Sum
                | Op::Product
                | Op::Division
                | Op::Power
                | Op::Condition(_)
                | Op::Conditional
        )
    }

    /// Writes an operand, wrapped in parentheses if needed.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.needs_parens() {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Returns a comma-separated rendering of the given items.
fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns a rendering of the given free indices.
fn fmt_free(free: &[(FreeIndex, usize)]) -> String {
    join(free.iter().map(|(index, _)| index))
}

fn free_mismatch(op: &'static str, lhs: &Expr, rhs: &Expr) -> Error {
    Error::new(format!("{}, {}", lhs, rhs), FreeIndexMismatch {
        op,
        lhs: fmt_free(lhs.free_indices()),
        rhs: fmt_free(rhs.free_indices()),
    })
}

fn check_scalar(op: &Op, expr: &Expr) -> Result<(), Error> {
    if expr.rank() != 0 {
        return Err(Error::new(expr, NonScalarOperand { op: op.name(), shape: expr.shape().to_vec() }));
    }
    Ok(())
}

fn check_same_shape(op: &'static str, lhs: &Expr, rhs: &Expr) -> Result<(), Error> {
    if lhs.shape() != rhs.shape() {
        return Err(Error::new(format!("{}, {}", lhs, rhs), ShapeMismatch {
            op,
            lhs: lhs.shape().to_vec(),
            rhs: rhs.shape().to_vec(),
        }));
    }
    Ok(())
}

fn check_same_free(op: &'static str, lhs: &Expr, rhs: &Expr) -> Result<(), Error> {
    if lhs.free_indices() != rhs.free_indices() {
        return Err(free_mismatch(op, lhs, rhs));
    }
    Ok(())
}

/// Checks if two expressions are **structurally** equal.
///
/// For more information about structural equality, see the [module-level documentation](self).
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((lhs, rhs)) = pending.pop() {
            if Self::ptr_eq(lhs, rhs) {
                continue;
            }
            let (lhs, rhs) = (&lhs.0, &rhs.0);
            if lhs.hash != rhs.hash
                || lhs.op != rhs.op
                || lhs.shape != rhs.shape
                || lhs.free_indices != rhs.free_indices
                || lhs.operands.len() != rhs.operands.len()
            {
                return false;
            }
            pending.extend(lhs.operands.iter().zip(&rhs.operands));
        }
        true
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = &self.0.operands;
        match &self.0.op {
            Op::Terminal(terminal) => write!(f, "{}", terminal),
            Op::MultiIndex(indices) => write!(f, "({})", join(indices)),
            Op::Label(id) => write!(f, "l{}", id),
            Op::Indexed => {
                operands[0].fmt_operand(f)?;
                match operands[1].as_multi_index() {
                    Some(indices) => write!(f, "[{}]", join(indices)),
                    None => write!(f, "[{}]", operands[1]),
                }
            },
            Op::Grad(_) => write!(f, "grad({})", operands[0]),
            Op::Restricted(side) => {
                operands[0].fmt_operand(f)?;
                write!(f, "({})", side)
            },
            Op::ReferenceValue => write!(f, "reference_value({})", operands[0]),
            Op::CellAvg => write!(f, "cell_avg({})", operands[0]),
            Op::FacetAvg => write!(f, "facet_avg({})", operands[0]),
            Op::Sum | Op::Product | Op::Division | Op::Power => {
                let symbol = self.0.op.name();
                operands[0].fmt_operand(f)?;
                write!(f, " {} ", symbol)?;
                operands[1].fmt_operand(f)
            },
            Op::Condition(ConditionKind::Not) => {
                write!(f, "!")?;
                operands[0].fmt_operand(f)
            },
            Op::Condition(kind) => {
                operands[0].fmt_operand(f)?;
                write!(f, " {} ", kind.symbol())?;
                operands[1].fmt_operand(f)
            },
            Op::Math(func) => write!(f, "{}({})", func.name(), operands[0]),
            Op::Abs => write!(f, "|{}|", operands[0]),
            Op::Conj | Op::Real | Op::Imag => write!(f, "{}({})", self.0.op.name(), operands[0]),
            Op::Conditional => {
                operands[0].fmt_operand(f)?;
                write!(f, " ? ")?;
                operands[1].fmt_operand(f)?;
                write!(f, " : ")?;
                operands[2].fmt_operand(f)
            },
            Op::IndexSum => write!(f, "sum_{}({})", operands[1], operands[0]),
            Op::ComponentTensor => write!(f, "as_tensor({}, {})", operands[0], operands[1]),
            Op::ListTensor => write!(f, "[{}]", join(operands)),
            Op::Variable => write!(f, "variable({}, {})", operands[0], operands[1]),
        }
    }
}

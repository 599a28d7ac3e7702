//! Tensor-valued symbolic expressions of variational forms.
//!
//! This crate provides the expression representation consumed by the scalar IR in `formc-ir`:
//! an immutable, shareable [`Expr`] tree with tensor shapes and free indices, the analysis of
//! modified terminals, and the scalar reconstruction rule of every operator.
//!
//! ```
//! use formc_expr::{Expr, FreeIndex, Index};
//!
//! // sum_j A[i, j] * b[j]
//! let (i, j) = (FreeIndex(0), FreeIndex(1));
//! let a = Expr::coefficient("A", vec![2, 3]);
//! let b = Expr::coefficient("b", vec![3]);
//! let aij = a.indexed(&[Index::Free(i), Index::Free(j)]).unwrap();
//! let bj = b.indexed(&[Index::Free(j)]).unwrap();
//! let ab = Expr::index_sum(&Expr::product(&aij, &bj).unwrap(), j).unwrap();
//! let matvec = Expr::component_tensor(&ab, &[i]).unwrap();
//!
//! assert_eq!(matvec.shape(), &[2]);
//! assert_eq!(matvec.value_count(), 2);
//! ```

pub mod error;
pub mod expr;
pub mod index;
pub mod modified;
pub mod primitive;
pub mod reconstruct;
pub mod symmetry;
pub mod terminal;

pub use expr::{ConditionKind, Expr, ExprId, Kind, MathFunction, Node, Op, Side};
pub use index::{compute_indices, FreeIndex, Index};
pub use reconstruct::{Component, ComponentRef, ScalarOp};
pub use symmetry::Symmetry;
pub use terminal::{Primary, Terminal};

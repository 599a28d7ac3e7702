//! Indices, multi-indices and the canonical enumeration of tensor components.

use std::fmt;

/// A free index, such as the `i` in `A[i, 0]`.
///
/// Free indices are identified by number only. Their dimension is determined by the tensor axis
/// they index, and is recorded on every expression they are free in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FreeIndex(pub usize);

impl fmt::Display for FreeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// A single entry of a multi-index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Index {
    /// A fixed component, such as the `1` in `A[1, i]`.
    Fixed(usize),

    /// A free index, such as the `i` in `A[1, i]`.
    Free(FreeIndex),
}

impl From<usize> for Index {
    fn from(value: usize) -> Self {
        Self::Fixed(value)
    }
}

impl From<FreeIndex> for Index {
    fn from(value: FreeIndex) -> Self {
        Self::Free(value)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Free(i) => write!(f, "{}", i),
        }
    }
}

/// The free indices of an expression, paired with their dimensions, sorted by index.
pub type FreeIndices = Vec<(FreeIndex, usize)>;

/// Returns the number of components of a tensor with the given shape. A scalar has one
/// component.
pub fn component_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Returns every multi-index within the given shape, in row-major order.
///
/// A rank-0 shape yields exactly one (empty) multi-index. A shape with a zero-sized axis yields
/// none.
pub fn compute_indices(shape: &[usize]) -> Vec<Vec<usize>> {
    let mut indices = Vec::with_capacity(component_count(shape));
    if shape.iter().any(|&dim| dim == 0) {
        return indices;
    }

    let mut current = vec![0; shape.len()];
    loop {
        indices.push(current.clone());

        // increment like an odometer, last axis fastest
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return indices;
            }
            axis -= 1;
            current[axis] += 1;
            if current[axis] < shape[axis] {
                break;
            }
            current[axis] = 0;
        }
    }
}

/// Returns the row-major position of the given multi-index within the given shape.
pub fn flat_index(shape: &[usize], component: &[usize]) -> usize {
    shape.iter()
        .zip(component)
        .fold(0, |acc, (dim, c)| acc * dim + c)
}

/// Returns the dimensions of the given free indices.
pub fn free_dims(free: &[(FreeIndex, usize)]) -> Vec<usize> {
    free.iter().map(|&(_, dim)| dim).collect()
}

/// Returns the position of the given free-index assignment within the enumeration of `free`.
///
/// `value_of` returns the value assigned to each index of `free`.
pub fn free_position(free: &[(FreeIndex, usize)], value_of: impl Fn(FreeIndex) -> usize) -> usize {
    free.iter().fold(0, |acc, &(index, dim)| acc * dim + value_of(index))
}

/// Merges two sorted lists of free indices, keeping shared indices once.
///
/// Returns the index whose dimensions disagree, if any.
pub fn merge_free(
    lhs: &[(FreeIndex, usize)],
    rhs: &[(FreeIndex, usize)],
) -> Result<FreeIndices, FreeIndex> {
    let mut merged = lhs.to_vec();
    for &(index, dim) in rhs {
        match merged.iter().find(|(other, _)| *other == index) {
            Some(&(_, other_dim)) if other_dim != dim => return Err(index),
            Some(_) => {},
            None => merged.push((index, dim)),
        }
    }
    merged.sort();
    Ok(merged)
}

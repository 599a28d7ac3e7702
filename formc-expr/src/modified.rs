//! Analysis and component extraction of modified terminals.
//!
//! A modified terminal is a terminal value wrapped in zero or more terminal modifiers, such as
//! `grad(u)('+')[0, 1]`. Indexing may only be the outermost modifier. The expression below the
//! indexing is called the **core** of the modified terminal.

use crate::{
    error::{MisplacedIndexing, NotModifiedTerminal},
    expr::{Expr, Op},
    index::{compute_indices, free_dims, FreeIndex, Index},
    terminal::Terminal,
};
use formc_error::Error;

/// Replaces the free indices of `indices` by their values in an assignment of `free`.
pub(crate) fn substitute(indices: &[Index], free: &[(FreeIndex, usize)], values: &[usize]) -> Vec<usize> {
    indices.iter()
        .map(|index| match *index {
            Index::Fixed(n) => n,
            Index::Free(i) => value_of(free, values, i),
        })
        .collect()
}

/// Returns the value of `index` in an assignment of `free`.
pub(crate) fn value_of(free: &[(FreeIndex, usize)], values: &[usize], index: FreeIndex) -> usize {
    free.iter()
        .position(|&(other, _)| other == index)
        .map(|pos| values[pos])
        .unwrap_or(0)
}

impl Expr {
    /// Splits a modified terminal into its core, the multi-index of an outermost indexing (if
    /// any), and the terminal value at the bottom.
    fn split_modified_terminal(&self) -> Result<(&Expr, Option<&[Index]>, &Terminal), Error> {
        let (core, indices) = match self.op() {
            Op::Indexed => (&self.operands()[0], self.operands()[1].as_multi_index()),
            _ => (self, None),
        };

        let mut expr = core;
        loop {
            match expr.op() {
                Op::Terminal(terminal) => return Ok((core, indices, terminal)),
                Op::Indexed => return Err(Error::new(self, MisplacedIndexing)),
                op if op.is_terminal_modifier() => expr = &expr.operands()[0],
                _ => return Err(Error::new(self, NotModifiedTerminal { op: self.op().name() })),
            }
        }
    }

    /// Returns every assignment of values to the free indices of this expression, in order.
    pub fn free_assignments(&self) -> Vec<Vec<usize>> {
        compute_indices(&free_dims(self.free_indices()))
    }

    /// For each scalar component of this modified terminal, returns its core and the canonical
    /// component of the core that holds its value.
    ///
    /// Components that alias each other through a symmetry of the terminal map to the same
    /// canonical component. The symmetry applies to the axes of the terminal itself; axes added by
    /// gradients are kept as they are.
    pub fn terminal_components(&self) -> Result<Vec<(Expr, Vec<usize>)>, Error> {
        let (core, indices, terminal) = self.split_modified_terminal()?;
        let rank = terminal.shape().len();
        let canonical = |component: &[usize]| match terminal.symmetry() {
            Some(symmetry) => {
                let mut canonical = symmetry.canonical(&component[..rank]);
                canonical.extend_from_slice(&component[rank..]);
                canonical
            },
            None => component.to_vec(),
        };

        let components = match indices {
            None => compute_indices(core.shape())
                .iter()
                .map(|component| (core.clone(), canonical(component)))
                .collect(),
            Some(indices) => self.free_assignments()
                .iter()
                .map(|values| {
                    let component = substitute(indices, self.free_indices(), values);
                    (core.clone(), canonical(&component))
                })
                .collect(),
        };
        Ok(components)
    }

    /// Extracts every scalar component of this modified terminal, in component order.
    ///
    /// A scalar modified terminal is its own sole component. Otherwise each component is the core
    /// indexed at a fixed multi-index; free indices are replaced by their values.
    pub fn scalar_components(&self) -> Result<Vec<Expr>, Error> {
        let (core, indices, _) = self.split_modified_terminal()?;
        match indices {
            None if core.rank() == 0 => Ok(vec![core.clone()]),
            None => compute_indices(core.shape())
                .iter()
                .map(|component| core.component(component))
                .collect(),
            Some(_) if self.free_indices().is_empty() => Ok(vec![self.clone()]),
            Some(indices) => self.free_assignments()
                .iter()
                .map(|values| core.component(&substitute(indices, self.free_indices(), values)))
                .collect(),
        }
    }
}

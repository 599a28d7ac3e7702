use std::collections::BTreeMap;

/// A mapping from the components of a tensor to the canonical component holding the same value.
///
/// Components without an entry are their own canonical component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Symmetry {
    map: BTreeMap<Vec<usize>, Vec<usize>>,
}

impl Symmetry {
    /// Creates an empty symmetry, where every component is canonical.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the symmetry of a symmetric `dim` by `dim` tensor, mapping `(j, i)` to `(i, j)`
    /// for `i < j`.
    pub fn symmetric(dim: usize) -> Self {
        let mut symmetry = Self::new();
        for i in 0..dim {
            for j in i + 1..dim {
                symmetry.insert(vec![j, i], vec![i, j]);
            }
        }
        symmetry
    }

    /// Declares `component` to hold the same value as `canonical`.
    pub fn insert(&mut self, component: Vec<usize>, canonical: Vec<usize>) {
        self.map.insert(component, canonical);
    }

    /// Returns the canonical component for the given component.
    pub fn canonical(&self, component: &[usize]) -> Vec<usize> {
        self.map
            .get(component)
            .cloned()
            .unwrap_or_else(|| component.to_vec())
    }

    /// Returns true if no component is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

//! Terminal values: the leaves of a form expression that carry a value.

use crate::symmetry::Symmetry;
use rug::{Float, Integer};
use std::fmt;

/// A literal number.
#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    /// An integer, such as `2` or `144`.
    Integer(Integer),

    /// A floating-point number, such as `3.14` or `0.5`.
    Float(Float),
}

/// [`Hash`] is implemented manually to allow hashing [`Primary::Float`]s. Literals **must never**
/// be `NaN`, otherwise [`Eq`] is not reflexive. Both zeros hash the same, since they compare
/// equal.
impl std::hash::Hash for Primary {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Integer(int) => int.hash(state),
            Self::Float(float) if float.is_zero() => 0.0f64.to_bits().hash(state),
            Self::Float(float) => float.to_f64().to_bits().hash(state),
        }
    }
}

impl Eq for Primary {}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(num) => write!(f, "{}", num),
            Self::Float(num) => write!(f, "{}", num.to_f64()),
        }
    }
}

impl From<Integer> for Primary {
    fn from(value: Integer) -> Self {
        Self::Integer(value)
    }
}

impl From<Float> for Primary {
    fn from(value: Float) -> Self {
        Self::Float(value)
    }
}

/// A terminal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// A scalar literal.
    Literal(Primary),

    /// A tensor of zeros with the given shape.
    Zero(Vec<usize>),

    /// A coefficient function, such as a material parameter or a known solution.
    Coefficient {
        name: String,
        shape: Vec<usize>,
        symmetry: Symmetry,
    },

    /// A test or trial function of the form, identified by its argument number.
    Argument {
        number: usize,
        shape: Vec<usize>,
    },

    /// A geometric quantity of the cell, such as the spatial coordinate or the Jacobian.
    Geometric {
        name: String,
        shape: Vec<usize>,
    },
}

impl Terminal {
    /// Returns the shape of the terminal value.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Literal(_) => &[],
            Self::Zero(shape)
                | Self::Coefficient { shape, .. }
                | Self::Argument { shape, .. }
                | Self::Geometric { shape, .. } => shape,
        }
    }

    /// Returns the component symmetry of the terminal value, if it has one.
    pub fn symmetry(&self) -> Option<&Symmetry> {
        match self {
            Self::Coefficient { symmetry, .. } if !symmetry.is_empty() => Some(symmetry),
            _ => None,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(primary) => write!(f, "{}", primary),
            Self::Zero(shape) if shape.is_empty() => write!(f, "0"),
            Self::Zero(shape) => write!(f, "zero{:?}", shape),
            Self::Coefficient { name, .. } | Self::Geometric { name, .. } => write!(f, "{}", name),
            Self::Argument { number, .. } => write!(f, "v_{}", number),
        }
    }
}

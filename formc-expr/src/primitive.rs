//! Functions to construct [`Integer`]s and [`Float`]s for literal values.

use rug::{Assign, Float, Integer};

/// The number of bits of precision used for literal [`Float`]s.
pub const PRECISION: u32 = 1 << 9;

/// Creates an [`Integer`] with the given value.
pub fn int<T>(n: T) -> Integer
where
    Integer: From<T>,
{
    Integer::from(n)
}

/// Creates a [`Float`] with the given value.
pub fn float<T>(n: T) -> Float
where
    Float: Assign<T>,
{
    Float::with_val(PRECISION, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_precision() {
        assert_eq!(float(0.5).prec(), PRECISION);
        assert_eq!(float(0.5), 0.5);
    }

    #[test]
    fn int_value() {
        assert_eq!(int(-3), -3);
    }
}

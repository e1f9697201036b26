use crate::scalar_type::Element;

/// A boxed number used as the right-hand side of tensor-scalar operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// An integral value.
    Int(i64),
    /// A floating point value.
    Float(f64),
}

impl Scalar {
    /// Converts the scalar to an element type with `as` semantics.
    #[inline]
    pub fn to<T: Element>(self) -> T {
        match self {
            Scalar::Int(v) => T::cast_from(v),
            Scalar::Float(v) => T::cast_from(v),
        }
    }

    /// Returns true if the scalar holds a floating point value.
    pub fn is_floating_point(&self) -> bool {
        matches!(self, Scalar::Float(_))
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Scalar {
            fn from(value: $t) -> Self {
                Scalar::Int(i64::from(value))
            }
        })*
    };
}

impl_from_int!(u8, i8, i16, i32, i64);

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(f64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversions() {
        assert_eq!(Scalar::from(3u8), Scalar::Int(3));
        assert_eq!(Scalar::from(2.5f32), Scalar::Float(2.5));
        assert_eq!(Scalar::Float(2.5).to::<i32>(), 2);
        assert_eq!(Scalar::Int(-1).to::<u8>(), 255);
        assert!(Scalar::from(1.0f64).is_floating_point());
    }
}

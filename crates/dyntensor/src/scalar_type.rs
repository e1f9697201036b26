use std::fmt;

use num_traits::AsPrimitive;

/// Runtime tag for the element type stored in a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalarType {
    /// `u8`
    Byte,
    /// `i8`
    Char,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    #[default]
    Float,
    /// `f64`
    Double,
}

impl ScalarType {
    /// All the scalar types known to the library.
    pub const ALL: [ScalarType; 7] = [
        ScalarType::Byte,
        ScalarType::Char,
        ScalarType::Short,
        ScalarType::Int,
        ScalarType::Long,
        ScalarType::Float,
        ScalarType::Double,
    ];

    /// Returns the name of the scalar type, e.g. `"Float"`.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Byte => "Byte",
            ScalarType::Char => "Char",
            ScalarType::Short => "Short",
            ScalarType::Int => "Int",
            ScalarType::Long => "Long",
            ScalarType::Float => "Float",
            ScalarType::Double => "Double",
        }
    }

    /// Returns the size in bytes of one element.
    pub fn element_size(&self) -> usize {
        match self {
            ScalarType::Byte | ScalarType::Char => 1,
            ScalarType::Short => 2,
            ScalarType::Int | ScalarType::Float => 4,
            ScalarType::Long | ScalarType::Double => 8,
        }
    }

    /// Returns true for `Float` and `Double`.
    pub fn is_floating_point(&self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compute backend a tensor type lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// Host memory.
    #[default]
    Cpu,
    /// CUDA device memory. No types are registered for it in this crate.
    Cuda,
}

impl Backend {
    /// Returns the name of the backend, e.g. `"CPU"`.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Cpu => "CPU",
            Backend::Cuda => "CUDA",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Rust primitive that can be stored in a tensor.
///
/// Ties a compile-time type to its runtime [`ScalarType`] tag. Conversions
/// between element types follow `as` cast semantics, and integer arithmetic
/// wraps.
pub trait Element:
    Copy
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
    + AsPrimitive<u8>
    + AsPrimitive<i8>
    + AsPrimitive<i16>
    + AsPrimitive<i32>
    + AsPrimitive<i64>
    + AsPrimitive<f32>
    + AsPrimitive<f64>
{
    /// The runtime tag matching this type.
    const SCALAR_TYPE: ScalarType;

    /// Converts any other element into this type with `as` semantics.
    fn cast_from<S: Element>(value: S) -> Self;

    /// Element-wise addition.
    fn add_elem(self, rhs: Self) -> Self;

    /// Element-wise subtraction.
    fn sub_elem(self, rhs: Self) -> Self;

    /// Element-wise multiplication.
    fn mul_elem(self, rhs: Self) -> Self;

    /// Element-wise division, `None` on integer division by zero.
    fn div_elem(self, rhs: Self) -> Option<Self>;

    /// Negation.
    fn neg_elem(self) -> Self;
}

macro_rules! impl_integer_element {
    ($t:ty, $name:ident) => {
        impl Element for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$name;

            #[inline]
            fn cast_from<S: Element>(value: S) -> Self {
                <S as AsPrimitive<$t>>::as_(value)
            }

            #[inline]
            fn add_elem(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline]
            fn sub_elem(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            #[inline]
            fn mul_elem(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            #[inline]
            fn div_elem(self, rhs: Self) -> Option<Self> {
                if rhs == 0 {
                    return None;
                }
                Some(self.wrapping_div(rhs))
            }

            #[inline]
            fn neg_elem(self) -> Self {
                self.wrapping_neg()
            }
        }
    };
}

macro_rules! impl_float_element {
    ($t:ty, $name:ident) => {
        impl Element for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$name;

            #[inline]
            fn cast_from<S: Element>(value: S) -> Self {
                <S as AsPrimitive<$t>>::as_(value)
            }

            #[inline]
            fn add_elem(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn sub_elem(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline]
            fn mul_elem(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline]
            fn div_elem(self, rhs: Self) -> Option<Self> {
                Some(self / rhs)
            }

            #[inline]
            fn neg_elem(self) -> Self {
                -self
            }
        }
    };
}

impl_integer_element!(u8, Byte);
impl_integer_element!(i8, Char);
impl_integer_element!(i16, Short);
impl_integer_element!(i32, Int);
impl_integer_element!(i64, Long);
impl_float_element!(f32, Float);
impl_float_element!(f64, Double);

/// Evaluates `$body` with `$t` bound to the Rust type matching a runtime tag.
macro_rules! dispatch_scalar_type {
    ($scalar_type:expr, $t:ident => $body:expr) => {
        match $scalar_type {
            $crate::ScalarType::Byte => {
                type $t = u8;
                $body
            }
            $crate::ScalarType::Char => {
                type $t = i8;
                $body
            }
            $crate::ScalarType::Short => {
                type $t = i16;
                $body
            }
            $crate::ScalarType::Int => {
                type $t = i32;
                $body
            }
            $crate::ScalarType::Long => {
                type $t = i64;
                $body
            }
            $crate::ScalarType::Float => {
                type $t = f32;
                $body
            }
            $crate::ScalarType::Double => {
                type $t = f64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_scalar_type;

use thiserror::Error;

use crate::{
    allocator::TensorAllocatorError,
    scalar_type::{Backend, ScalarType},
};

/// Error type for tensor handle operations.
///
/// Every variant is detected by an explicit precondition check and returned
/// immediately. None of them is worth retrying: they indicate a programming
/// error or an unsupported configuration.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// An operation other than construction, assignment, `defined()` or
    /// `reset()` was invoked on an undefined tensor.
    #[error("Uninitialized tensor: `{operation}` called on an undefined tensor")]
    UninitializedTensor {
        /// Name of the operation that was attempted
        operation: &'static str,
    },

    /// The requested element type does not match the tensor's scalar type.
    ///
    /// # Example
    /// ```ignore
    /// // Error: expected scalar type Int but found Float
    /// let t = Tensor::from_vec(&[2], vec![1.0f32, 2.0])?;
    /// let ptr = t.data::<i32>()?;
    /// ```
    #[error("Type mismatch: expected scalar type {expected} but found {actual}")]
    TypeMismatch {
        /// Scalar type requested by the caller
        expected: ScalarType,
        /// Scalar type of the tensor
        actual: ScalarType,
    },

    /// An accessor was requested with the wrong rank.
    #[error("Rank mismatch: {message}. Expected {expected} dims but tensor has {actual}")]
    RankMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Rank requested by the caller
        expected: usize,
        /// Dimensionality of the tensor
        actual: usize,
    },

    /// No type is registered to convert to.
    #[error("Unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Description of the source type
        from: String,
        /// Description of the requested target
        to: String,
    },

    /// Tensor shape does not match the provided data.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// The number of elements of a shape, or its size in bytes, does not fit
    /// in `usize`.
    #[error("Shape overflow: {sizes} holds more elements than fit in memory")]
    ShapeOverflow {
        /// The offending shape
        sizes: String,
    },

    /// Tensor dimensions incompatible for the requested operation.
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Integer division by zero in an element-wise kernel.
    #[error("Integer division by zero")]
    DivisionByZero,

    /// Underlying storage allocation failed.
    #[error("Storage error: {0}")]
    StorageError(#[from] TensorAllocatorError),
}

impl TensorError {
    /// Creates a TypeMismatch error.
    pub fn type_mismatch(expected: ScalarType, actual: ScalarType) -> Self {
        Self::TypeMismatch { expected, actual }
    }

    /// Creates a RankMismatch error with context.
    pub fn rank_mismatch(message: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::RankMismatch {
            message: message.into(),
            expected,
            actual,
        }
    }

    /// Creates an UnsupportedConversion error for a backend/scalar type pair.
    pub fn unsupported_conversion(
        from: impl Into<String>,
        backend: Backend,
        scalar_type: ScalarType,
    ) -> Self {
        Self::UnsupportedConversion {
            from: from.into(),
            to: format!("{backend}{scalar_type}Type"),
        }
    }

    /// Creates an InvalidShape error.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates a ShapeOverflow error for `sizes`.
    pub fn shape_overflow(sizes: &[usize]) -> Self {
        Self::ShapeOverflow {
            sizes: format!("{:?}", sizes),
        }
    }

    /// Creates an IndexOutOfBounds error.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a DimensionMismatch error with formatted shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Returns true if this error indicates a programming error rather than
    /// an unsupported configuration or an allocation failure.
    pub fn is_programming_error(&self) -> bool {
        match self {
            Self::UninitializedTensor { .. }
            | Self::TypeMismatch { .. }
            | Self::RankMismatch { .. }
            | Self::InvalidShape { .. }
            | Self::ShapeOverflow { .. }
            | Self::DimensionMismatch { .. }
            | Self::IndexOutOfBounds { .. }
            | Self::DivisionByZero => true,
            Self::UnsupportedConversion { .. } | Self::StorageError(_) => false,
        }
    }
}

#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `dyntensor` is the handle layer of a tensor library. A [`Tensor`] is a cheap,
//! value-semantic handle around a shared, reference-counted [`TensorImpl`] that
//! carries the shape, strides, storage and runtime element type of a tensor.
//!
//! # Architecture
//!
//! - **Tensor**: the handle. Clone shares, drop releases, assignment swaps
//! - **TensorImpl**: the shared object holding [`Storage`] and geometry
//! - **TensorType**: one `'static` descriptor per backend and scalar type, through
//!   which copies, conversions and in-place kernels are dispatched
//! - **TypedAccessor**: rank- and type-checked element access
//!
//! # Quick Start
//!
//! ```rust
//! use dyntensor::{ScalarType, Tensor};
//!
//! let t = Tensor::from_shape_vec(&[2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//!
//! // handles share the same object
//! let alias = t.clone();
//! assert!(alias.is_same(&t));
//!
//! // rows are views over the same storage
//! let row = t.at(1).unwrap();
//! row.accessor::<f32, 1>().unwrap().set([0], 40.0).unwrap();
//! assert_eq!(alias.accessor::<f32, 2>().unwrap().get([1, 0]), Some(40.0));
//!
//! // conversions allocate a new object unless the type already matches
//! let ints = t.to_scalar_type(ScalarType::Int).unwrap();
//! assert_eq!(ints.to_vec::<i32>().unwrap(), vec![1, 2, 3, 40, 5, 6]);
//! assert!(t.to_scalar_type(ScalarType::Float).unwrap().is_same(&t));
//! ```
//!
//! # Thread Safety
//!
//! Handles are `!Send` and `!Sync`: the reference count is not atomic and the
//! storage is mutated in place without synchronization.

/// Rank- and type-checked accessors into tensor storage.
pub mod accessor;

/// Allocator module containing memory management utilities.
///
/// This module provides the [`TensorAllocator`] trait and the default
/// [`CpuAllocator`] using the system allocator.
pub mod allocator;

/// CPU type descriptors and their element-wise kernels.
pub mod cpu;

/// Error types for the tensor handle.
pub mod error;

/// Factory options.
pub mod options;

/// Boxed numbers for tensor-scalar operations.
pub mod scalar;

/// Scalar types, backends and the [`Element`] trait.
pub mod scalar_type;

/// Storage module containing the reference-counted byte buffer.
pub mod storage;

/// Tensor module containing the handle.
pub mod tensor;

/// The shared tensor object and its geometry.
pub mod tensor_impl;

pub mod tensor_type;

pub use crate::accessor::TypedAccessor;
pub use crate::allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError};
pub use crate::cpu::CpuType;
pub use crate::error::TensorError;
pub use crate::options::TensorOptions;
pub use crate::scalar::Scalar;
pub use crate::scalar_type::{Backend, Element, ScalarType};
pub use crate::storage::Storage;
pub use crate::tensor::Tensor;
pub use crate::tensor_impl::{Geometry, TensorImpl};
pub use crate::tensor_type::{type_for, BinaryOp, TensorType, TypeKey};

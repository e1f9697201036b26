use std::alloc;
use std::alloc::Layout;

use thiserror::Error;

use crate::scalar_type::Backend;

/// An error type for tensor allocator operations.
#[derive(Debug, Error, PartialEq)]
pub enum TensorAllocatorError {
    /// The requested size and alignment do not form a valid layout.
    #[error("Invalid tensor layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// The allocator returned a null pointer.
    #[error("Null pointer")]
    NullPointer,
}

/// A trait for allocating and deallocating memory for tensor storage.
///
/// # Methods
///
/// * `alloc_zeroed` - Allocates zero-initialized memory with the given layout.
/// * `dealloc` - Deallocates memory previously returned by `alloc_zeroed`.
pub trait TensorAllocator: Clone {
    /// Returns the backend this allocator serves.
    fn backend(&self) -> Backend;

    /// Allocates zero-initialized memory with the given layout.
    fn alloc_zeroed(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError>;

    /// Deallocates memory with the given layout.
    fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

/// A tensor allocator that uses the system allocator.
#[derive(Clone, Debug, Default)]
pub struct CpuAllocator;

impl TensorAllocator for CpuAllocator {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    /// Allocates zero-initialized memory for a tensor with the given layout.
    ///
    /// # Arguments
    ///
    /// * `layout` - The layout of the buffer. Its size must be non-zero.
    ///
    /// # Returns
    ///
    /// A non-null pointer to the allocated memory if successful, otherwise an error.
    fn alloc_zeroed(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            Err(TensorAllocatorError::NullPointer)?
        }
        Ok(ptr)
    }

    /// Deallocates memory for a tensor with the given layout.
    ///
    /// # Safety
    ///
    /// The pointer must come from `alloc_zeroed` with the same layout.
    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() {
            unsafe { alloc::dealloc(ptr, layout) }
        }
    }
}

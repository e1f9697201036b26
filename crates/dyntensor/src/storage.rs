//! Reference-counted, type-erased storage shared by a tensor and its views.
//!
//! The buffer is a raw allocation interpreted by its owner's scalar type.
//! Clones are cheap and alias the same memory, so writes through one handle
//! are visible through every other.

use std::{alloc::Layout, ptr::NonNull, rc::Rc};

use crate::{
    allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError},
    scalar_type::Element,
    TensorError,
};

/// Alignment of every storage buffer, enough for any [`Element`].
const STORAGE_ALIGN: usize = 16;

/// Inner storage implementation that holds the actual memory.
struct StorageImpl {
    /// The pointer to the storage memory, non-null.
    ptr: NonNull<u8>,
    /// Number of usable bytes.
    nbytes: usize,
    /// The memory layout used for allocation.
    layout: Layout,
    alloc: CpuAllocator,
}

impl Drop for StorageImpl {
    fn drop(&mut self) {
        log::trace!("freeing storage of {} bytes", self.nbytes);
        self.alloc.dealloc(self.ptr.as_ptr(), self.layout);
    }
}

/// Shared byte buffer backing one or more tensors.
///
/// # Thread Safety
///
/// `Storage` is neither `Send` nor `Sync`. Writes go through a raw pointer
/// without synchronization, so sharing is confined to one thread.
#[derive(Clone)]
pub struct Storage {
    inner: Rc<StorageImpl>,
}

impl Storage {
    /// Allocates `nbytes` of zero-initialized memory.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails.
    pub fn zeroed(nbytes: usize) -> Result<Self, TensorError> {
        let alloc = CpuAllocator;
        // zero-sized allocations are not allowed by the global allocator
        let layout = Layout::from_size_align(nbytes.max(1), STORAGE_ALIGN)
            .map_err(TensorAllocatorError::LayoutError)?;
        let ptr = NonNull::new(alloc.alloc_zeroed(layout)?).ok_or(TensorAllocatorError::NullPointer)?;
        Ok(Self {
            inner: Rc::new(StorageImpl {
                ptr,
                nbytes,
                layout,
                alloc,
            }),
        })
    }

    /// Creates a new storage holding a copy of `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails.
    pub fn from_slice<T: Element>(data: &[T]) -> Result<Self, TensorError> {
        let storage = Self::zeroed(std::mem::size_of_val(data))?;
        // SAFETY: the buffer was just allocated with room for `data.len()`
        // elements and a suitable alignment; the regions do not overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                storage.as_ptr() as *mut T,
                data.len(),
            );
        }
        Ok(storage)
    }

    /// Creates a new storage of `nbytes` whose prefix is copied from `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if memory allocation fails.
    pub fn resized(&self, nbytes: usize) -> Result<Self, TensorError> {
        let storage = Self::zeroed(nbytes)?;
        let n = nbytes.min(self.nbytes());
        // SAFETY: both buffers hold at least `n` bytes and are distinct allocations.
        unsafe {
            std::ptr::copy_nonoverlapping(self.as_ptr(), storage.as_ptr(), n);
        }
        Ok(storage)
    }

    /// Returns the pointer to the start of the buffer.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.inner.ptr.as_ptr()
    }

    /// Returns the number of usable bytes.
    #[inline]
    pub fn nbytes(&self) -> usize {
        self.inner.nbytes
    }

    /// Returns how many `T` fit in the buffer.
    #[inline]
    pub fn capacity<T: Element>(&self) -> usize {
        self.nbytes() / std::mem::size_of::<T>()
    }

    /// Returns the number of owners of this buffer.
    #[inline]
    pub fn use_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Returns true if both storages alias the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reads the element at `index`, interpreting the buffer as `T`.
    ///
    /// Returns `None` if the element lies outside the buffer.
    #[inline]
    pub fn get<T: Element>(&self, index: usize) -> Option<T> {
        if index >= self.capacity::<T>() {
            return None;
        }
        // SAFETY: in bounds (checked above) and aligned, since the base is
        // aligned to STORAGE_ALIGN and every element type divides it.
        Some(unsafe { (self.as_ptr() as *const T).add(index).read() })
    }

    /// Writes `value` at `index`, interpreting the buffer as `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the element lies outside the buffer.
    #[inline]
    pub fn set<T: Element>(&self, index: usize, value: T) -> Result<(), TensorError> {
        let capacity = self.capacity::<T>();
        if index >= capacity {
            return Err(TensorError::index_out_of_bounds(index, capacity));
        }
        // SAFETY: see `get`. No reference into the buffer is ever handed
        // out, so writing through the raw pointer cannot invalidate one.
        unsafe { (self.as_ptr() as *mut T).add(index).write(value) };
        Ok(())
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &self.inner.ptr)
            .field("nbytes", &self.inner.nbytes)
            .field("use_count", &self.use_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_from_slice() -> Result<(), TensorError> {
        let storage = Storage::from_slice(&[1i32, 2, 3, 4, 5])?;
        assert_eq!(storage.nbytes(), 5 * std::mem::size_of::<i32>());
        assert_eq!(storage.capacity::<i32>(), 5);
        assert_eq!(storage.get::<i32>(4), Some(5));
        assert_eq!(storage.get::<i32>(5), None);
        Ok(())
    }

    #[test]
    fn storage_zero_sized() -> Result<(), TensorError> {
        let storage = Storage::zeroed(0)?;
        assert_eq!(storage.nbytes(), 0);
        assert_eq!(storage.get::<u8>(0), None);
        Ok(())
    }

    #[test]
    fn storage_clone_aliases() -> Result<(), TensorError> {
        let storage1 = Storage::from_slice(&[1.0f64, 2.0])?;
        let storage2 = storage1.clone();
        assert!(storage1.ptr_eq(&storage2));
        assert_eq!(storage1.use_count(), 2);

        storage2.set(0, 10.0f64)?;
        assert_eq!(storage1.get::<f64>(0), Some(10.0));
        assert!(storage2.set(2, 1.0f64).is_err());
        Ok(())
    }

    #[test]
    fn storage_resized_keeps_prefix() -> Result<(), TensorError> {
        let storage = Storage::from_slice(&[1u8, 2, 3])?;
        let grown = storage.resized(5)?;
        assert!(!grown.ptr_eq(&storage));
        assert_eq!(grown.get::<u8>(2), Some(3));
        assert_eq!(grown.get::<u8>(4), Some(0));
        Ok(())
    }
}

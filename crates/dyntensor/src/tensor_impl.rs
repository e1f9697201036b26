use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
};

use crate::{storage::Storage, tensor_type::TensorType, TensorError};

/// Number of elements of a shape, checking for overflow.
///
/// A shape with a zero-sized dimension has no elements however large the
/// other dimensions are.
///
/// # Errors
///
/// Returns `ShapeOverflow` if the product does not fit in `usize`.
pub fn checked_numel(sizes: &[usize]) -> Result<usize, TensorError> {
    if sizes.contains(&0) {
        return Ok(0);
    }
    sizes
        .iter()
        .try_fold(1usize, |acc, &size| acc.checked_mul(size))
        .ok_or_else(|| TensorError::shape_overflow(sizes))
}

/// Computes the strides for a row-major (C-contiguous) layout.
///
/// The rightmost dimension has stride 1, and each dimension's stride is the
/// product of all dimensions to its right.
///
/// ```rust
/// use dyntensor::tensor_impl::contiguous_strides;
///
/// assert_eq!(contiguous_strides(&[2, 3, 4]), vec![12, 4, 1]);
/// assert!(contiguous_strides(&[]).is_empty());
/// ```
pub fn contiguous_strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; sizes.len()];
    let mut stride: usize = 1;
    for i in (0..sizes.len()).rev() {
        strides[i] = stride;
        // only a zero-element shape can exceed usize here
        stride = stride.saturating_mul(sizes[i]);
    }
    strides
}

/// Shape, strides and storage offset of a tensor.
///
/// Offsets and strides are counted in elements, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    /// Size of every dimension. Empty for a zero-dim tensor.
    pub sizes: Vec<usize>,
    /// Stride of every dimension, same length as `sizes`.
    pub strides: Vec<usize>,
    /// Offset of the first element inside the storage.
    pub offset: usize,
}

impl Geometry {
    /// Row-major geometry starting at the beginning of the storage.
    pub fn contiguous(sizes: &[usize]) -> Self {
        Self {
            sizes: sizes.to_vec(),
            strides: contiguous_strides(sizes),
            offset: 0,
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn ndimension(&self) -> usize {
        self.sizes.len()
    }

    /// Number of elements, 1 for a zero-dim tensor.
    ///
    /// Every geometry built by the crate has passed [`checked_numel`], so the
    /// saturation never triggers for them.
    #[inline]
    pub fn numel(&self) -> usize {
        checked_numel(&self.sizes).unwrap_or(usize::MAX)
    }

    /// Storage index of the `linear`-th element in row-major logical order.
    pub fn storage_index(&self, linear: usize) -> usize {
        let mut rem = linear;
        let mut index = self.offset;
        for (&size, &stride) in self.sizes.iter().zip(&self.strides).rev() {
            index += (rem % size) * stride;
            rem /= size;
        }
        index
    }

    /// One past the largest storage index this geometry can reach, or `None`
    /// if it does not fit in `usize`.
    pub fn storage_extent(&self) -> Option<usize> {
        if self.numel() == 0 {
            return Some(self.offset);
        }
        self.sizes
            .iter()
            .zip(&self.strides)
            .try_fold(self.offset.checked_add(1)?, |acc, (&size, &stride)| {
                acc.checked_add((size - 1).checked_mul(stride)?)
            })
    }

    /// Returns true for a row-major layout.
    pub fn is_contiguous(&self) -> bool {
        self.strides == contiguous_strides(&self.sizes)
    }
}

/// The heap object behind every [`crate::Tensor`].
///
/// Holds the storage, the geometry and the type descriptor. Handles share one
/// `TensorImpl` through an `Rc`; views get their own `TensorImpl` over the
/// same [`Storage`].
pub struct TensorImpl {
    ty: &'static dyn TensorType,
    storage: RefCell<Storage>,
    geometry: RefCell<Geometry>,
}

impl TensorImpl {
    /// Creates a tensor object over `storage`.
    pub fn new(ty: &'static dyn TensorType, storage: Storage, geometry: Geometry) -> Self {
        Self {
            ty,
            storage: RefCell::new(storage),
            geometry: RefCell::new(geometry),
        }
    }

    /// Increments the reference count of the object behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`crate::Tensor::detach`] (or `Rc::into_raw`)
    /// and the object must still be alive.
    pub unsafe fn retain(ptr: *const TensorImpl) {
        log::trace!("retain {:p}", ptr);
        Rc::increment_strong_count(ptr);
    }

    /// Decrements the reference count of the object behind `ptr`, destroying
    /// it when the count reaches zero.
    ///
    /// # Safety
    ///
    /// Same as [`TensorImpl::retain`]; additionally the caller gives up one
    /// owning reference.
    pub unsafe fn release(ptr: *const TensorImpl) {
        log::trace!("release {:p}", ptr);
        Rc::decrement_strong_count(ptr);
    }

    /// The type descriptor of this tensor.
    #[inline]
    pub fn ty(&self) -> &'static dyn TensorType {
        self.ty
    }

    /// Borrows the geometry.
    #[inline]
    pub fn geometry(&self) -> Ref<'_, Geometry> {
        self.geometry.borrow()
    }

    /// Replaces the geometry.
    pub fn set_geometry(&self, geometry: Geometry) {
        *self.geometry.borrow_mut() = geometry;
    }

    /// Returns a handle to the storage.
    #[inline]
    pub fn storage(&self) -> Storage {
        self.storage.borrow().clone()
    }

    /// Replaces the storage, used when a resize outgrows it.
    pub fn set_storage(&self, storage: Storage) {
        *self.storage.borrow_mut() = storage;
    }

    /// Size of every dimension.
    pub fn sizes(&self) -> Vec<usize> {
        self.geometry().sizes.clone()
    }

    /// Stride of every dimension.
    pub fn strides(&self) -> Vec<usize> {
        self.geometry().strides.clone()
    }

    /// Offset of the first element inside the storage.
    pub fn storage_offset(&self) -> usize {
        self.geometry().offset
    }

    /// Number of dimensions.
    pub fn ndimension(&self) -> usize {
        self.geometry().ndimension()
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.geometry().numel()
    }

    /// Pointer to the first element, accounting for the storage offset.
    pub fn data_ptr(&self) -> *mut u8 {
        let element_size = self.ty.scalar_type().element_size();
        let offset_bytes = self.storage_offset() * element_size;
        self.storage
            .borrow()
            .as_ptr()
            .wrapping_add(offset_bytes)
    }
}

impl fmt::Display for TensorImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}Tensor",
            self.ty.backend(),
            self.ty.scalar_type()
        )
    }
}

impl fmt::Debug for TensorImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorImpl")
            .field("type", &self.ty.name())
            .field("geometry", &*self.geometry())
            .field("storage", &*self.storage.borrow())
            .finish()
    }
}

impl Drop for TensorImpl {
    fn drop(&mut self) {
        log::trace!("destroying {} of sizes {:?}", self, self.geometry.borrow().sizes);
    }
}

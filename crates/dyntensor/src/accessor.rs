use std::marker::PhantomData;

use crate::{scalar_type::Element, storage::Storage, Tensor, TensorError};

/// Rank- and type-checked indexing into a tensor's storage.
///
/// Built with [`Tensor::accessor`], which verifies that `T` matches the
/// tensor's scalar type and `N` its dimensionality. Reads and writes go
/// straight to the shared storage, so they are visible through every handle
/// and view of it.
///
/// # Examples
///
/// ```rust
/// use dyntensor::Tensor;
///
/// let t = Tensor::from_shape_vec(&[2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let mut acc = t.accessor::<f32, 2>().unwrap();
/// assert_eq!(acc.get([1, 2]), Some(6.0));
///
/// acc.set([0, 1], 20.0).unwrap();
/// assert_eq!(t.to_vec::<f32>().unwrap()[1], 20.0);
/// ```
pub struct TypedAccessor<'a, T: Element, const N: usize> {
    storage: Storage,
    offset: usize,
    sizes: [usize; N],
    strides: [usize; N],
    _tensor: PhantomData<&'a Tensor>,
    _element: PhantomData<T>,
}

impl<'a, T: Element, const N: usize> TypedAccessor<'a, T, N> {
    pub(crate) fn new(
        storage: Storage,
        offset: usize,
        sizes: &[usize],
        strides: &[usize],
    ) -> Result<Self, TensorError> {
        let to_array = |dims: &[usize]| {
            <[usize; N]>::try_from(dims).map_err(|_| {
                TensorError::rank_mismatch("accessor rank must equal the tensor dimensionality", N, dims.len())
            })
        };
        Ok(Self {
            storage,
            offset,
            sizes: to_array(sizes)?,
            strides: to_array(strides)?,
            _tensor: PhantomData,
            _element: PhantomData,
        })
    }

    /// Storage index of `index`, or `None` if any coordinate is out of range.
    fn storage_index(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = self.offset;
        for ((&idx, &size), &stride) in index.iter().zip(&self.sizes).zip(&self.strides) {
            if idx >= size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Get the element at the given index, checking bounds.
    ///
    /// # Returns
    ///
    /// The element, or `None` if the index is out of bounds.
    pub fn get(&self, index: [usize; N]) -> Option<T> {
        self.storage_index(index)
            .and_then(|offset| self.storage.get::<T>(offset))
    }

    /// Set the element at the given index, checking bounds.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` naming the first offending coordinate.
    pub fn set(&mut self, index: [usize; N], value: T) -> Result<(), TensorError> {
        match self.storage_index(index) {
            Some(offset) => self.storage.set(offset, value),
            None => {
                let (idx, size) = index
                    .iter()
                    .zip(&self.sizes)
                    .find(|(idx, size)| idx >= size)
                    .map_or((0, 0), |(&idx, &size)| (idx, size));
                Err(TensorError::index_out_of_bounds(idx, size))
            }
        }
    }

    /// Typed pointer to the first element.
    pub fn as_ptr(&self) -> *mut T {
        (self.storage.as_ptr() as *mut T).wrapping_add(self.offset)
    }

    /// Size of dimension `dim`.
    pub fn size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    /// Stride of dimension `dim`, in elements.
    pub fn stride(&self, dim: usize) -> usize {
        self.strides[dim]
    }

    /// Sizes of all dimensions.
    pub fn sizes(&self) -> &[usize; N] {
        &self.sizes
    }

    /// Strides of all dimensions.
    pub fn strides(&self) -> &[usize; N] {
        &self.strides
    }

    /// Number of elements reachable through the accessor.
    pub fn numel(&self) -> usize {
        self.sizes.iter().product()
    }
}

use std::{
    fmt,
    ops::{AddAssign, DivAssign, MulAssign, Neg, SubAssign},
    ptr,
    rc::Rc,
};

use crate::{
    accessor::TypedAccessor,
    cpu::gather,
    options::TensorOptions,
    scalar::Scalar,
    scalar_type::{Backend, Element, ScalarType},
    storage::Storage,
    tensor_impl::{checked_numel, Geometry, TensorImpl},
    tensor_type::{type_for, BinaryOp, TensorType},
    TensorError,
};

/// A reference-counted handle to a tensor object.
///
/// `Tensor` is a thin value type around one optional owning pointer to a
/// [`TensorImpl`]. Cloning a handle shares the object and bumps its count;
/// dropping releases it; the object is destroyed with its last owner. A handle
/// that owns nothing is *undefined*.
///
/// The object is shared and mutable: in-place operations such as
/// [`Tensor::copy_`] or [`Tensor::add_`] are observed by every handle and view
/// of the same storage.
///
/// Besides construction, assignment, [`Tensor::defined`] and
/// [`Tensor::reset`], every operation on an undefined handle fails with
/// [`TensorError::UninitializedTensor`].
///
/// # Examples
///
/// ```rust
/// use dyntensor::{ScalarType, Tensor};
///
/// let a = Tensor::from_shape_vec(&[2, 2], vec![1i32, 2, 3, 4]).unwrap();
/// let b = a.clone();
/// assert!(a.is_same(&b));
/// assert_eq!(a.use_count(), 2);
///
/// let c = a.to_scalar_type(ScalarType::Double).unwrap();
/// assert!(!c.is_same(&a));
/// assert_eq!(c.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Default)]
pub struct Tensor {
    inner: Option<Rc<TensorImpl>>,
}

impl Tensor {
    /// Creates an undefined tensor.
    pub const fn new() -> Self {
        Self { inner: None }
    }

    /// Creates a handle sharing `imp`, incrementing its count.
    pub fn from_impl(imp: &Rc<TensorImpl>) -> Self {
        Self {
            inner: Some(Rc::clone(imp)),
        }
    }

    /// Creates a handle that takes over an existing reference to `imp`.
    pub fn adopt(imp: Rc<TensorImpl>) -> Self {
        Self { inner: Some(imp) }
    }

    /// Creates a handle from a raw object pointer.
    ///
    /// With `retain` the count is incremented and the caller keeps its own
    /// reference; without it the handle adopts the caller's reference. A null
    /// pointer yields an undefined tensor.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from [`Tensor::detach`] and point at a live
    /// object. Without `retain`, the caller must own the reference it hands
    /// over and must not release it again.
    pub unsafe fn from_raw(ptr: *const TensorImpl, retain: bool) -> Self {
        if ptr.is_null() {
            return Self::new();
        }
        if retain {
            TensorImpl::retain(ptr);
        }
        Self {
            inner: Some(Rc::from_raw(ptr)),
        }
    }

    /// Relinquishes the owned reference as a raw pointer without releasing
    /// it, leaving the handle undefined. Returns null if it was undefined.
    ///
    /// The pointer must eventually go back through [`Tensor::from_raw`] with
    /// `retain = false` (or [`TensorImpl::release`]) or the object leaks.
    pub fn detach(&mut self) -> *const TensorImpl {
        match self.inner.take() {
            Some(imp) => {
                let raw = Rc::into_raw(imp);
                log::trace!("detached {:p}", raw);
                raw
            }
            None => ptr::null(),
        }
    }

    /// Moves the owned reference out, leaving this handle undefined.
    pub fn take(&mut self) -> Tensor {
        std::mem::take(self)
    }

    /// Exchanges the owned references of two handles. No count changes.
    #[inline]
    pub fn swap(&mut self, other: &mut Tensor) {
        std::mem::swap(&mut self.inner, &mut other.inner);
    }

    /// Copy assignment: makes this handle share `rhs`'s object.
    ///
    /// Copy-and-swap: `rhs` is cloned first, swapped in, and the previous
    /// object is released when the temporary drops. Self-assignment and
    /// assignment between handles of one object leave the count unchanged.
    pub fn assign(&mut self, rhs: &Tensor) -> &mut Self {
        Tensor::clone(rhs).swap(self);
        self
    }

    /// Move assignment: takes over `rhs`'s reference. The previous object is
    /// released when `rhs` drops at the end of the call.
    pub fn assign_move(&mut self, mut rhs: Tensor) -> &mut Self {
        rhs.swap(self);
        self
    }

    /// Makes the handle undefined, releasing the owned object if any.
    pub fn reset(&mut self) {
        Tensor::new().swap(self);
    }

    /// Re-points the handle at `imp`, retaining it.
    pub fn reset_to(&mut self, imp: &Rc<TensorImpl>) {
        Tensor::from_impl(imp).swap(self);
    }

    /// Re-points the handle at a raw object pointer.
    ///
    /// # Safety
    ///
    /// Same contract as [`Tensor::from_raw`].
    pub unsafe fn reset_raw(&mut self, ptr: *const TensorImpl, retain: bool) {
        Tensor::from_raw(ptr, retain).swap(self);
    }

    /// Returns the owned object, if any.
    #[inline]
    pub fn get(&self) -> Option<&Rc<TensorImpl>> {
        self.inner.as_ref()
    }

    /// Returns true if the handle owns an object.
    #[inline]
    pub fn defined(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of owners of the object, 0 for an undefined handle.
    pub fn use_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Rc::strong_count)
    }

    /// Returns true if both handles own the same object, or are both undefined.
    pub fn is_same(&self, other: &Tensor) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    #[inline]
    pub(crate) fn inner(&self, operation: &'static str) -> Result<&Rc<TensorImpl>, TensorError> {
        self.inner
            .as_ref()
            .ok_or(TensorError::UninitializedTensor { operation })
    }

    /// Creates a contiguous CPU tensor from a vector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if `data.len()` differs from the product of
    /// `sizes` (1 for `&[]`).
    pub fn from_shape_vec<T: Element>(sizes: &[usize], data: Vec<T>) -> Result<Self, TensorError> {
        Self::from_shape_slice(sizes, &data)
    }

    /// Creates a contiguous CPU tensor holding a copy of `data`.
    ///
    /// # Errors
    ///
    /// Returns `ShapeOverflow` if the product of `sizes` does not fit in
    /// `usize`, and `InvalidShape` if `data.len()` differs from it.
    pub fn from_shape_slice<T: Element>(sizes: &[usize], data: &[T]) -> Result<Self, TensorError> {
        let numel = checked_numel(sizes)?;
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        let ty = type_for(Backend::Cpu, T::SCALAR_TYPE)?;
        let imp = TensorImpl::new(ty, Storage::from_slice(data)?, Geometry::contiguous(sizes));
        Ok(Self::adopt(Rc::new(imp)))
    }

    /// Creates a zero-dim tensor holding `value`.
    pub fn scalar_tensor<T: Element>(value: T) -> Result<Self, TensorError> {
        Self::from_shape_slice(&[], &[value])
    }

    /// Creates a zero-filled tensor with the given options.
    ///
    /// # Errors
    ///
    /// Returns `ShapeOverflow` if the shape or its size in bytes does not fit
    /// in `usize`, and `UnsupportedConversion` for an unregistered type.
    pub fn zeros(sizes: &[usize], options: TensorOptions) -> Result<Self, TensorError> {
        options.ty()?.zeros(sizes)
    }

    /// Size of every dimension.
    pub fn sizes(&self) -> Result<Vec<usize>, TensorError> {
        Ok(self.inner("sizes")?.sizes())
    }

    /// Stride of every dimension, in elements.
    pub fn strides(&self) -> Result<Vec<usize>, TensorError> {
        Ok(self.inner("strides")?.strides())
    }

    /// Offset of the first element inside the storage, in elements.
    pub fn storage_offset(&self) -> Result<usize, TensorError> {
        Ok(self.inner("storage_offset")?.storage_offset())
    }

    /// Number of dimensions.
    pub fn ndimension(&self) -> Result<usize, TensorError> {
        Ok(self.inner("ndimension")?.ndimension())
    }

    /// Number of dimensions, same as [`Tensor::ndimension`].
    pub fn dim(&self) -> Result<usize, TensorError> {
        self.ndimension()
    }

    /// Number of elements.
    pub fn numel(&self) -> Result<usize, TensorError> {
        Ok(self.inner("numel")?.numel())
    }

    /// Returns true for a row-major layout.
    pub fn is_contiguous(&self) -> Result<bool, TensorError> {
        Ok(self.inner("is_contiguous")?.geometry().is_contiguous())
    }

    /// The type descriptor of the tensor.
    #[inline]
    pub fn ty(&self) -> Result<&'static dyn TensorType, TensorError> {
        Ok(self.inner("ty")?.ty())
    }

    /// The scalar type of the tensor.
    pub fn scalar_type(&self) -> Result<ScalarType, TensorError> {
        Ok(self.ty()?.scalar_type())
    }

    /// The type name of the tensor, e.g. `"CPUFloatTensor"`.
    ///
    /// Unlike the `Display` impl, fails on an undefined handle.
    pub fn try_to_string(&self) -> Result<String, TensorError> {
        Ok(self.inner("to_string")?.to_string())
    }

    /// Untyped pointer to the first element.
    pub fn data_ptr(&self) -> Result<*mut u8, TensorError> {
        Ok(self.inner("data_ptr")?.data_ptr())
    }

    /// Converts the tensor to type `ty`.
    ///
    /// If `ty` is already the tensor's type the result shares this object and
    /// nothing is copied. Otherwise `ty` allocates a converted copy.
    pub fn to_type(&self, ty: &dyn TensorType) -> Result<Tensor, TensorError> {
        let current = self.ty()?;
        if current.id() == ty.id() {
            return Ok(self.clone());
        }
        log::debug!("converting {} to {}", current.name(), ty.name());
        ty.copy_new(self)
    }

    /// Converts the tensor to another scalar type on the same backend.
    pub fn to_scalar_type(&self, scalar_type: ScalarType) -> Result<Tensor, TensorError> {
        let target = self.ty()?.to_scalar_type(scalar_type)?;
        self.to_type(target)
    }

    /// Converts the tensor to another backend with the same scalar type.
    pub fn to_backend(&self, backend: Backend) -> Result<Tensor, TensorError> {
        let target = self.ty()?.to_backend(backend)?;
        self.to_type(target)
    }

    /// Copies `src` into this tensor in place.
    ///
    /// The tensor is first resized to `src`'s shape, then `src`'s elements
    /// are converted to this tensor's type and written to its storage. Every
    /// handle sharing the storage observes the new contents.
    pub fn copy_(&mut self, src: &Tensor) -> Result<&mut Self, TensorError> {
        let ty = self.ty()?;
        self.resize_(&src.sizes()?)?;
        ty.copy(src, self)?;
        Ok(self)
    }

    /// Resizes the tensor in place to `sizes` with a row-major layout.
    pub fn resize_(&mut self, sizes: &[usize]) -> Result<&mut Self, TensorError> {
        self.ty()?.resize_(self, sizes)?;
        Ok(self)
    }

    /// Sets every element to `value`.
    pub fn fill_(&mut self, value: impl Into<Scalar>) -> Result<&mut Self, TensorError> {
        self.ty()?.fill_(self, value.into())?;
        Ok(self)
    }

    fn binary_op_(&mut self, op: BinaryOp, other: &Tensor) -> Result<&mut Self, TensorError> {
        self.ty()?.binary_op_(op, self, other)?;
        Ok(self)
    }

    fn binary_op_scalar_(&mut self, op: BinaryOp, value: Scalar) -> Result<&mut Self, TensorError> {
        self.ty()?.binary_op_scalar_(op, self, value)?;
        Ok(self)
    }

    /// In-place element-wise `self += other`.
    pub fn add_(&mut self, other: &Tensor) -> Result<&mut Self, TensorError> {
        self.binary_op_(BinaryOp::Add, other)
    }

    /// In-place element-wise `self -= other`.
    pub fn sub_(&mut self, other: &Tensor) -> Result<&mut Self, TensorError> {
        self.binary_op_(BinaryOp::Sub, other)
    }

    /// In-place element-wise `self *= other`.
    pub fn mul_(&mut self, other: &Tensor) -> Result<&mut Self, TensorError> {
        self.binary_op_(BinaryOp::Mul, other)
    }

    /// In-place element-wise `self /= other`.
    pub fn div_(&mut self, other: &Tensor) -> Result<&mut Self, TensorError> {
        self.binary_op_(BinaryOp::Div, other)
    }

    /// In-place `self += value`.
    pub fn add_scalar_(&mut self, value: impl Into<Scalar>) -> Result<&mut Self, TensorError> {
        self.binary_op_scalar_(BinaryOp::Add, value.into())
    }

    /// In-place `self -= value`.
    pub fn sub_scalar_(&mut self, value: impl Into<Scalar>) -> Result<&mut Self, TensorError> {
        self.binary_op_scalar_(BinaryOp::Sub, value.into())
    }

    /// In-place `self *= value`.
    pub fn mul_scalar_(&mut self, value: impl Into<Scalar>) -> Result<&mut Self, TensorError> {
        self.binary_op_scalar_(BinaryOp::Mul, value.into())
    }

    /// In-place `self /= value`.
    pub fn div_scalar_(&mut self, value: impl Into<Scalar>) -> Result<&mut Self, TensorError> {
        self.binary_op_scalar_(BinaryOp::Div, value.into())
    }

    /// Returns a new tensor holding `-self`.
    pub fn neg(&self) -> Result<Tensor, TensorError> {
        self.ty()?.neg(self)
    }

    /// Returns a view with dimension `dim` fixed at `index`. The view shares
    /// storage with this tensor.
    pub fn select(&self, dim: usize, index: usize) -> Result<Tensor, TensorError> {
        self.ty()?.select(self, dim, index)
    }

    /// Returns the `index`-th slice along the first dimension, as a view.
    pub fn at(&self, index: usize) -> Result<Tensor, TensorError> {
        self.select(0, index)
    }

    /// Typed pointer to the first element.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if `T` does not match the tensor's scalar type.
    pub fn data<T: Element>(&self) -> Result<*mut T, TensorError> {
        let imp = self.inner("data")?;
        let actual = imp.ty().scalar_type();
        if actual != T::SCALAR_TYPE {
            return Err(TensorError::type_mismatch(T::SCALAR_TYPE, actual));
        }
        Ok(imp.data_ptr() as *mut T)
    }

    /// Builds a checked accessor of rank `N` over elements of type `T`.
    ///
    /// # Errors
    ///
    /// Returns `RankMismatch` if `N` is 0 (use [`Tensor::data`] for scalars)
    /// or differs from [`Tensor::dim`], and `TypeMismatch` if `T` does not
    /// match the scalar type.
    pub fn accessor<T: Element, const N: usize>(&self) -> Result<TypedAccessor<'_, T, N>, TensorError> {
        let imp = self.inner("accessor")?;
        if N == 0 {
            return Err(TensorError::rank_mismatch(
                "accessor is used for indexing a tensor, for scalars use data::<T>()",
                N,
                imp.ndimension(),
            ));
        }
        let dim = self.dim()?;
        if dim != N {
            return Err(TensorError::rank_mismatch(
                "accessor rank must equal the tensor dimensionality",
                N,
                dim,
            ));
        }
        self.data::<T>()?;
        let geometry = imp.geometry();
        TypedAccessor::new(imp.storage(), geometry.offset, &geometry.sizes, &geometry.strides)
    }

    /// Returns the elements in logical (row-major) order.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if `T` does not match the scalar type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        self.data::<T>()?;
        gather::<T>(self)
    }

    /// Returns the only element of a one-element tensor.
    pub fn item<T: Element>(&self) -> Result<T, TensorError> {
        let numel = self.numel()?;
        if numel != 1 {
            return Err(TensorError::invalid_shape(1, numel));
        }
        let values = self.to_vec::<T>()?;
        Ok(values[0])
    }
}

macro_rules! typed_data {
    ($($t:ty => $method:ident),* $(,)?) => {
        impl Tensor {
            $(
                #[doc = concat!("Same as `data::<", stringify!($t), ">()`.")]
                pub fn $method(&self) -> Result<*mut $t, TensorError> {
                    self.data::<$t>()
                }
            )*
        }
    };
}

typed_data!(
    u8 => to_byte_data,
    i8 => to_char_data,
    i16 => to_short_data,
    i32 => to_int_data,
    i64 => to_long_data,
    f32 => to_float_data,
    f64 => to_double_data,
);

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source);
    }
}

macro_rules! assign_op {
    ($trait:ident, $method:ident, $tensor_op:ident, $scalar_op:ident) => {
        impl $trait<&Tensor> for Tensor {
            /// # Panics
            ///
            /// Panics if the in-place operation fails, e.g. on a shape
            /// mismatch or an undefined tensor.
            fn $method(&mut self, rhs: &Tensor) {
                if let Err(e) = self.$tensor_op(rhs) {
                    panic!("{}: {}", stringify!($tensor_op), e);
                }
            }
        }

        impl $trait<Scalar> for Tensor {
            /// # Panics
            ///
            /// Panics if the in-place operation fails.
            fn $method(&mut self, rhs: Scalar) {
                if let Err(e) = self.$scalar_op(rhs) {
                    panic!("{}: {}", stringify!($scalar_op), e);
                }
            }
        }
    };
}

assign_op!(AddAssign, add_assign, add_, add_scalar_);
assign_op!(SubAssign, sub_assign, sub_, sub_scalar_);
assign_op!(MulAssign, mul_assign, mul_, mul_scalar_);
assign_op!(DivAssign, div_assign, div_, div_scalar_);

impl Neg for &Tensor {
    type Output = Tensor;

    /// # Panics
    ///
    /// Panics on an undefined tensor.
    fn neg(self) -> Tensor {
        match Tensor::neg(self) {
            Ok(t) => t,
            Err(e) => panic!("neg: {e}"),
        }
    }
}

impl Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        -&self
    }
}

/// Prints the tensor's type name, e.g. `CPUFloatTensor`.
///
/// Formatting never fails, so an undefined handle prints `UndefinedTensor`
/// instead of erroring; use [`Tensor::try_to_string`] to reject it.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(imp) => write!(f, "{imp}"),
            None => f.write_str("UndefinedTensor"),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(imp) => f
                .debug_struct("Tensor")
                .field("type", &imp.ty().name())
                .field("sizes", &imp.geometry().sizes)
                .field("strides", &imp.geometry().strides)
                .field("use_count", &Rc::strong_count(imp))
                .finish(),
            None => f.write_str("Tensor(undefined)"),
        }
    }
}

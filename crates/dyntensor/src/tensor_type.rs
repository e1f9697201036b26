//! Runtime type descriptors.
//!
//! A [`TensorType`] stands for one (backend, scalar type) pair. Every
//! [`TensorImpl`](crate::tensor_impl::TensorImpl) points at its descriptor,
//! and the handle routes type-specific work (copies, conversions, in-place
//! kernels) through it. Descriptors are `'static` singletons looked up with
//! [`type_for`].

use crate::{
    cpu::CpuType,
    scalar::Scalar,
    scalar_type::{Backend, ScalarType},
    Tensor, TensorError,
};

/// Identity of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    /// The backend half of the identity.
    pub backend: Backend,
    /// The scalar type half of the identity.
    pub scalar_type: ScalarType,
}

/// Element-wise binary operations dispatched through a [`TensorType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
}

/// Dispatch table for one (backend, scalar type) pair.
///
/// Implementations allocate, copy and convert tensor objects, and provide the
/// in-place kernels the [`Tensor`] operators delegate to. Every method taking a
/// tensor expects it to be defined and of this type unless stated otherwise.
pub trait TensorType: Send + Sync + 'static {
    /// The backend of this type.
    fn backend(&self) -> Backend;

    /// The scalar type of this type.
    fn scalar_type(&self) -> ScalarType;

    /// A display name such as `"CPUFloatType"`.
    fn name(&self) -> &'static str;

    /// The identity of this type.
    fn id(&self) -> TypeKey {
        TypeKey {
            backend: self.backend(),
            scalar_type: self.scalar_type(),
        }
    }

    /// The sibling type on the same backend with another scalar type.
    fn to_scalar_type(&self, scalar_type: ScalarType) -> Result<&'static dyn TensorType, TensorError> {
        type_for(self.backend(), scalar_type)
            .map_err(|_| TensorError::unsupported_conversion(self.name(), self.backend(), scalar_type))
    }

    /// The sibling type on another backend with the same scalar type.
    fn to_backend(&self, backend: Backend) -> Result<&'static dyn TensorType, TensorError> {
        type_for(backend, self.scalar_type())
            .map_err(|_| TensorError::unsupported_conversion(self.name(), backend, self.scalar_type()))
    }

    /// Allocates a zero-filled, contiguous tensor of this type.
    fn zeros(&self, sizes: &[usize]) -> Result<Tensor, TensorError>;

    /// Copies the elements of `src` into `dst`, converting as needed.
    ///
    /// `src` may be of any type; `dst` is of this type and must have the same
    /// number of elements.
    fn copy(&self, src: &Tensor, dst: &Tensor) -> Result<(), TensorError>;

    /// Allocates a new tensor of this type holding the converted contents of
    /// `src`, which may be of any type.
    fn copy_new(&self, src: &Tensor) -> Result<Tensor, TensorError> {
        let dst = self.zeros(&src.sizes()?)?;
        self.copy(src, &dst)?;
        Ok(dst)
    }

    /// Resizes `tensor` in place to `sizes`, growing the storage if needed.
    fn resize_(&self, tensor: &Tensor, sizes: &[usize]) -> Result<(), TensorError>;

    /// Sets every element of `tensor` to `value`.
    fn fill_(&self, tensor: &Tensor, value: Scalar) -> Result<(), TensorError>;

    /// `tensor = tensor op other`, element-wise; `other` may be of any type
    /// but must have the same shape.
    fn binary_op_(&self, op: BinaryOp, tensor: &Tensor, other: &Tensor) -> Result<(), TensorError>;

    /// `tensor = tensor op value`, element-wise.
    fn binary_op_scalar_(&self, op: BinaryOp, tensor: &Tensor, value: Scalar) -> Result<(), TensorError>;

    /// Returns a new tensor holding `-tensor`.
    fn neg(&self, tensor: &Tensor) -> Result<Tensor, TensorError>;

    /// Returns a view of `tensor` with dimension `dim` fixed at `index`.
    fn select(&self, tensor: &Tensor, dim: usize, index: usize) -> Result<Tensor, TensorError>;
}

impl std::fmt::Debug for dyn TensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

static CPU_BYTE: CpuType<u8> = CpuType::new();
static CPU_CHAR: CpuType<i8> = CpuType::new();
static CPU_SHORT: CpuType<i16> = CpuType::new();
static CPU_INT: CpuType<i32> = CpuType::new();
static CPU_LONG: CpuType<i64> = CpuType::new();
static CPU_FLOAT: CpuType<f32> = CpuType::new();
static CPU_DOUBLE: CpuType<f64> = CpuType::new();

/// Looks up the descriptor registered for a (backend, scalar type) pair.
///
/// # Errors
///
/// Returns `UnsupportedConversion` if the pair has no registered type. Only
/// CPU types are registered.
pub fn type_for(backend: Backend, scalar_type: ScalarType) -> Result<&'static dyn TensorType, TensorError> {
    match backend {
        Backend::Cpu => {
            let ty: &'static dyn TensorType = match scalar_type {
                ScalarType::Byte => &CPU_BYTE,
                ScalarType::Char => &CPU_CHAR,
                ScalarType::Short => &CPU_SHORT,
                ScalarType::Int => &CPU_INT,
                ScalarType::Long => &CPU_LONG,
                ScalarType::Float => &CPU_FLOAT,
                ScalarType::Double => &CPU_DOUBLE,
            };
            Ok(ty)
        }
        Backend::Cuda => Err(TensorError::unsupported_conversion(
            "the type registry",
            backend,
            scalar_type,
        )),
    }
}

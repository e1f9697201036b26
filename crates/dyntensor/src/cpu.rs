use std::{marker::PhantomData, rc::Rc};

use crate::{
    scalar::Scalar,
    scalar_type::{dispatch_scalar_type, Backend, Element, ScalarType},
    storage::Storage,
    tensor_impl::{checked_numel, contiguous_strides, Geometry, TensorImpl},
    tensor_type::{type_for, BinaryOp, TensorType},
    Tensor, TensorError,
};

/// The CPU type descriptor for element type `T`.
///
/// Kernels are plain element loops over the logical (row-major) order of a
/// tensor, honoring its strides and storage offset.
pub struct CpuType<T: Element> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Element> CpuType<T> {
    /// Creates the descriptor. Use [`type_for`] to get the registered instance.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Returns the defined object behind `tensor`, checking it has this type.
    fn checked<'a>(
        &self,
        tensor: &'a Tensor,
        operation: &'static str,
    ) -> Result<&'a Rc<TensorImpl>, TensorError> {
        let imp = tensor.inner(operation)?;
        let actual = imp.ty().scalar_type();
        if actual != T::SCALAR_TYPE {
            return Err(TensorError::type_mismatch(T::SCALAR_TYPE, actual));
        }
        Ok(imp)
    }

    /// Wraps a new contiguous object of this type around `storage`.
    fn wrap(&self, sizes: &[usize], storage: Storage) -> Result<Tensor, TensorError> {
        let ty = type_for(Backend::Cpu, T::SCALAR_TYPE)?;
        let imp = TensorImpl::new(ty, storage, Geometry::contiguous(sizes));
        Ok(Tensor::adopt(Rc::new(imp)))
    }
}

impl<T: Element> Default for CpuType<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads every element of `tensor` in logical order, converted to `T`.
pub(crate) fn gather<T: Element>(tensor: &Tensor) -> Result<Vec<T>, TensorError> {
    let imp = tensor.inner("gather")?;
    let storage = imp.storage();
    let geometry = imp.geometry();
    dispatch_scalar_type!(imp.ty().scalar_type(), S => read_converted::<S, T>(&storage, &geometry))
}

fn read_converted<S: Element, T: Element>(
    storage: &Storage,
    geometry: &Geometry,
) -> Result<Vec<T>, TensorError> {
    (0..geometry.numel())
        .map(|i| {
            let index = geometry.storage_index(i);
            storage
                .get::<S>(index)
                .map(T::cast_from)
                .ok_or_else(|| TensorError::index_out_of_bounds(index, storage.capacity::<S>()))
        })
        .collect()
}

/// Writes `values` into `imp` in logical order.
fn scatter<T: Element>(imp: &TensorImpl, values: &[T]) -> Result<(), TensorError> {
    let storage = imp.storage();
    let geometry = imp.geometry();
    for (i, &value) in values.iter().enumerate() {
        storage.set(geometry.storage_index(i), value)?;
    }
    Ok(())
}

/// Converts a scalar operand to `T`, truncating floats for integer tensors.
fn scalar_to<T: Element>(value: Scalar) -> T {
    if value.is_floating_point() && !T::SCALAR_TYPE.is_floating_point() {
        log::debug!("truncating {:?} to {}", value, T::SCALAR_TYPE);
    }
    value.to::<T>()
}

fn apply<T: Element>(op: BinaryOp, a: T, b: T) -> Result<T, TensorError> {
    match op {
        BinaryOp::Add => Ok(a.add_elem(b)),
        BinaryOp::Sub => Ok(a.sub_elem(b)),
        BinaryOp::Mul => Ok(a.mul_elem(b)),
        BinaryOp::Div => a.div_elem(b).ok_or(TensorError::DivisionByZero),
    }
}

impl<T: Element> TensorType for CpuType<T> {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn scalar_type(&self) -> ScalarType {
        T::SCALAR_TYPE
    }

    fn name(&self) -> &'static str {
        type_name(T::SCALAR_TYPE)
    }

    fn zeros(&self, sizes: &[usize]) -> Result<Tensor, TensorError> {
        let nbytes = checked_numel(sizes)?
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| TensorError::shape_overflow(sizes))?;
        let storage = Storage::zeroed(nbytes)?;
        self.wrap(sizes, storage)
    }

    fn copy(&self, src: &Tensor, dst: &Tensor) -> Result<(), TensorError> {
        let dst_impl = self.checked(dst, "copy")?;
        let src_impl = src.inner("copy")?;
        let src_ty = src_impl.ty();
        if src_ty.backend() != Backend::Cpu {
            return Err(TensorError::unsupported_conversion(
                src_ty.name(),
                Backend::Cpu,
                T::SCALAR_TYPE,
            ));
        }
        if src_impl.numel() != dst_impl.numel() {
            return Err(TensorError::dimension_mismatch(
                "copy requires the same number of elements",
                &dst_impl.sizes(),
                &src_impl.sizes(),
            ));
        }
        // read everything first so that overlapping storage is safe
        let values = gather::<T>(src)?;
        scatter(dst_impl, &values)
    }

    fn resize_(&self, tensor: &Tensor, sizes: &[usize]) -> Result<(), TensorError> {
        let imp = self.checked(tensor, "resize_")?;
        if imp.geometry().sizes == sizes {
            return Ok(());
        }
        checked_numel(sizes)?;
        let geometry = Geometry {
            sizes: sizes.to_vec(),
            strides: contiguous_strides(sizes),
            offset: imp.storage_offset(),
        };
        let needed = geometry
            .storage_extent()
            .and_then(|extent| extent.checked_mul(std::mem::size_of::<T>()))
            .ok_or_else(|| TensorError::shape_overflow(sizes))?;
        let storage = imp.storage();
        if needed > storage.nbytes() {
            log::debug!(
                "growing storage of {} from {} to {} bytes",
                imp,
                storage.nbytes(),
                needed
            );
            imp.set_storage(storage.resized(needed)?);
        }
        imp.set_geometry(geometry);
        Ok(())
    }

    fn fill_(&self, tensor: &Tensor, value: Scalar) -> Result<(), TensorError> {
        let imp = self.checked(tensor, "fill_")?;
        let values = vec![scalar_to::<T>(value); imp.numel()];
        scatter(imp, &values)
    }

    fn binary_op_(&self, op: BinaryOp, tensor: &Tensor, other: &Tensor) -> Result<(), TensorError> {
        let imp = self.checked(tensor, "binary_op_")?;
        let other_sizes = other.sizes()?;
        if imp.geometry().sizes != other_sizes {
            return Err(TensorError::dimension_mismatch(
                format!("{op:?} requires tensors of the same shape"),
                &imp.sizes(),
                &other_sizes,
            ));
        }
        let lhs = gather::<T>(tensor)?;
        let rhs = gather::<T>(other)?;
        // compute the whole result before writing so a failure leaves `tensor` untouched
        let out = lhs
            .into_iter()
            .zip(rhs)
            .map(|(a, b)| apply(op, a, b))
            .collect::<Result<Vec<T>, _>>()?;
        scatter(imp, &out)
    }

    fn binary_op_scalar_(&self, op: BinaryOp, tensor: &Tensor, value: Scalar) -> Result<(), TensorError> {
        let imp = self.checked(tensor, "binary_op_scalar_")?;
        let rhs = scalar_to::<T>(value);
        let out = gather::<T>(tensor)?
            .into_iter()
            .map(|a| apply(op, a, rhs))
            .collect::<Result<Vec<T>, _>>()?;
        scatter(imp, &out)
    }

    fn neg(&self, tensor: &Tensor) -> Result<Tensor, TensorError> {
        let imp = self.checked(tensor, "neg")?;
        let values: Vec<T> = gather::<T>(tensor)?
            .into_iter()
            .map(Element::neg_elem)
            .collect();
        self.wrap(&imp.sizes(), Storage::from_slice(&values)?)
    }

    fn select(&self, tensor: &Tensor, dim: usize, index: usize) -> Result<Tensor, TensorError> {
        let imp = self.checked(tensor, "select")?;
        let Geometry {
            mut sizes,
            mut strides,
            offset,
        } = imp.geometry().clone();
        if dim >= sizes.len() {
            return Err(TensorError::index_out_of_bounds(dim, sizes.len()));
        }
        if index >= sizes[dim] {
            return Err(TensorError::index_out_of_bounds(index, sizes[dim]));
        }
        let offset = offset + index * strides[dim];
        sizes.remove(dim);
        strides.remove(dim);
        let view = TensorImpl::new(
            imp.ty(),
            imp.storage(),
            Geometry {
                sizes,
                strides,
                offset,
            },
        );
        Ok(Tensor::adopt(Rc::new(view)))
    }
}

fn type_name(scalar_type: ScalarType) -> &'static str {
    match scalar_type {
        ScalarType::Byte => "CPUByteType",
        ScalarType::Char => "CPUCharType",
        ScalarType::Short => "CPUShortType",
        ScalarType::Int => "CPUIntType",
        ScalarType::Long => "CPULongType",
        ScalarType::Float => "CPUFloatType",
        ScalarType::Double => "CPUDoubleType",
    }
}

use crate::{
    scalar_type::{Backend, ScalarType},
    tensor_type::{type_for, TensorType},
    TensorError,
};

/// Backend and scalar type used by tensor factories.
///
/// Defaults to `Cpu` / `Float`.
///
/// ```rust
/// use dyntensor::{Backend, ScalarType, Tensor, TensorOptions};
///
/// let options = TensorOptions::default().with_scalar_type(ScalarType::Long);
/// let t = Tensor::zeros(&[2, 2], options).unwrap();
/// assert_eq!(t.scalar_type().unwrap(), ScalarType::Long);
/// assert_eq!(t.ty().unwrap().backend(), Backend::Cpu);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TensorOptions {
    /// The backend to allocate on.
    pub backend: Backend,
    /// The element type.
    pub scalar_type: ScalarType,
}

impl TensorOptions {
    /// Options for the given backend and scalar type.
    pub fn new(backend: Backend, scalar_type: ScalarType) -> Self {
        Self {
            backend,
            scalar_type,
        }
    }

    /// Returns a copy with a different backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Returns a copy with a different scalar type.
    pub fn with_scalar_type(mut self, scalar_type: ScalarType) -> Self {
        self.scalar_type = scalar_type;
        self
    }

    /// Resolves the type descriptor for these options.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedConversion` if no type is registered for the pair.
    pub fn ty(&self) -> Result<&'static dyn TensorType, TensorError> {
        type_for(self.backend, self.scalar_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() -> Result<(), TensorError> {
        let options = TensorOptions::default();
        assert_eq!(options.backend, Backend::Cpu);
        assert_eq!(options.scalar_type, ScalarType::Float);
        assert_eq!(options.ty()?.name(), "CPUFloatType");
        Ok(())
    }

    #[test]
    fn unregistered_backend() {
        let options = TensorOptions::new(Backend::Cuda, ScalarType::Int);
        assert!(matches!(
            options.ty(),
            Err(TensorError::UnsupportedConversion { .. })
        ));
    }
}

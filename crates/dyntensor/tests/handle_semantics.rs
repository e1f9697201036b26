use std::rc::Rc;

use approx::assert_relative_eq;
use dyntensor::{Backend, ScalarType, Tensor, TensorError, TensorOptions};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn get_impl(t: &Tensor) -> Result<&Rc<dyntensor::TensorImpl>, TensorError> {
    t.get().ok_or(TensorError::UninitializedTensor { operation: "get" })
}

#[test]
fn object_destroyed_with_last_holder() -> Result<(), TensorError> {
    init_logger();
    let t = Tensor::zeros(&[4, 4], TensorOptions::default())?;
    let weak = Rc::downgrade(get_impl(&t)?);

    let mut holders: Vec<Tensor> = (0..5).map(|_| t.clone()).collect();
    assert_eq!(t.use_count(), 6);

    let mut moved = Tensor::new();
    moved.assign_move(holders.remove(0));
    let mut copied = Tensor::new();
    copied.assign(&moved);
    assert_eq!(t.use_count(), 7);

    drop(t);
    drop(holders);
    assert_eq!(moved.use_count(), 2);
    moved.reset();
    assert!(weak.upgrade().is_some());
    drop(copied);
    assert!(weak.upgrade().is_none());
    Ok(())
}

#[test]
fn self_assignment_is_a_no_op() -> Result<(), TensorError> {
    init_logger();
    let mut t = Tensor::from_shape_vec(&[3], vec![1i32, 2, 3])?;
    let same = t.clone();
    let count = t.use_count();
    t.assign(&same);
    assert_eq!(t.use_count(), count);
    assert!(t.is_same(&same));
    assert_eq!(t.to_vec::<i32>()?, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn move_transfers_without_count_change() -> Result<(), TensorError> {
    init_logger();
    let mut a = Tensor::from_shape_vec(&[2], vec![1.0f32, 2.0])?;
    let witness = a.clone();
    let b = a.take();
    assert!(!a.defined());
    assert!(b.is_same(&witness));
    assert_eq!(witness.use_count(), 2);
    assert!(matches!(
        a.numel(),
        Err(TensorError::UninitializedTensor { .. })
    ));
    Ok(())
}

#[test]
fn conversion_fast_path_and_round_trips() -> Result<(), TensorError> {
    init_logger();
    let t = Tensor::from_shape_vec(&[2, 2], vec![-1i32, 0, 7, i32::MAX])?;
    assert!(t.to_type(t.ty()?)?.is_same(&t));
    assert!(t.to_scalar_type(ScalarType::Int)?.is_same(&t));

    let long = t.to_scalar_type(ScalarType::Long)?;
    assert_eq!(long.sizes()?, vec![2, 2]);
    assert_eq!(
        long.to_scalar_type(ScalarType::Int)?.to_vec::<i32>()?,
        vec![-1, 0, 7, i32::MAX]
    );

    let d = Tensor::from_shape_vec(&[3], vec![std::f64::consts::PI, -2.5e-3, 12345.678])?;
    let back = d
        .to_scalar_type(ScalarType::Float)?
        .to_scalar_type(ScalarType::Double)?
        .to_vec::<f64>()?;
    for (x, y) in back.iter().zip(d.to_vec::<f64>()?) {
        assert_relative_eq!(*x, y, max_relative = f32::EPSILON as f64);
    }
    Ok(())
}

#[test]
fn conversion_of_view_follows_logical_order() -> Result<(), TensorError> {
    init_logger();
    let t = Tensor::from_shape_vec(&[2, 3], vec![1u8, 2, 3, 4, 5, 6])?;
    let column = t.select(1, 1)?;
    let converted = column.to_scalar_type(ScalarType::Short)?;
    assert!(converted.is_contiguous()?);
    assert_eq!(converted.to_vec::<i16>()?, vec![2, 5]);
    Ok(())
}

#[test]
fn unsupported_backend_propagates() -> Result<(), TensorError> {
    init_logger();
    let t = Tensor::from_shape_vec(&[1], vec![1i64])?;
    let err = t.to_backend(Backend::Cuda).err();
    assert!(matches!(err, Some(TensorError::UnsupportedConversion { .. })));
    assert!(matches!(
        Tensor::zeros(&[1], TensorOptions::default().with_backend(Backend::Cuda)),
        Err(TensorError::UnsupportedConversion { .. })
    ));
    Ok(())
}

#[test]
fn data_checks_scalar_type() -> Result<(), TensorError> {
    init_logger();
    let t = Tensor::zeros(&[3, 2], TensorOptions::default())?;
    match t.data::<i32>() {
        Err(e @ TensorError::TypeMismatch { .. }) => {
            let message = e.to_string();
            assert!(message.contains("Int"));
            assert!(message.contains("Float"));
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }

    let ptr = t.data::<f32>()?;
    let numel = t.numel()?;
    for i in 0..numel {
        unsafe { *ptr.add(i) = (i * 10) as f32 };
    }
    let read: Vec<f32> = (0..numel).map(|i| unsafe { *ptr.add(i) }).collect();
    assert_eq!(read, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    Ok(())
}

#[test]
fn accessor_rank_and_strides() -> Result<(), TensorError> {
    init_logger();
    let values: Vec<i64> = (0..24).collect();
    let t = Tensor::from_shape_vec(&[2, 3, 4], values)?;
    assert!(matches!(
        t.accessor::<i64, 2>(),
        Err(TensorError::RankMismatch {
            expected: 2,
            actual: 3,
            ..
        })
    ));

    let acc = t.accessor::<i64, 3>()?;
    let base = t.data::<i64>()?;
    let strides = t.strides()?;
    for i in 0..2 {
        for j in 0..3 {
            for k in 0..4 {
                let offset = i * strides[0] + j * strides[1] + k * strides[2];
                assert_eq!(acc.get([i, j, k]), Some(unsafe { *base.add(offset) }));
            }
        }
    }
    Ok(())
}

#[test]
fn indexing_aliases_parent_storage() -> Result<(), TensorError> {
    init_logger();
    let t = Tensor::from_shape_vec(&[2, 3], vec![0.0f32; 6])?;
    let row = t.at(0)?;
    assert!(!row.is_same(&t));
    assert_eq!(row.ndimension()?, 1);

    row.accessor::<f32, 1>()?.set([0], 99.0)?;
    assert_eq!(t.accessor::<f32, 2>()?.get([0, 0]), Some(99.0));

    let mut last = t.at(1)?;
    last.fill_(3.5)?;
    assert_eq!(t.to_vec::<f32>()?, vec![99.0, 0.0, 0.0, 3.5, 3.5, 3.5]);
    Ok(())
}

#[test]
fn copy_resizes_destination() -> Result<(), TensorError> {
    init_logger();
    let mut a = Tensor::zeros(&[4], TensorOptions::default().with_scalar_type(ScalarType::Double))?;
    let b = Tensor::from_shape_vec(&[2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?;
    a.copy_(&b)?;
    assert_eq!(a.sizes()?, vec![2, 2]);
    assert_eq!(a.scalar_type()?, ScalarType::Double);
    assert_eq!(a.to_vec::<f64>()?, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(b.to_vec::<f32>()?, vec![1.0, 2.0, 3.0, 4.0]);
    Ok(())
}

#[test]
fn raw_pointer_round_trip() -> Result<(), TensorError> {
    init_logger();
    let mut t = Tensor::from_shape_vec(&[1], vec![42u8])?;
    let keep = t.clone();
    let raw = t.detach();
    assert_eq!(keep.use_count(), 2);

    let restored = unsafe { Tensor::from_raw(raw, false) };
    assert!(restored.is_same(&keep));
    assert_eq!(keep.use_count(), 2);
    assert_eq!(restored.item::<u8>()?, 42);
    Ok(())
}

#[test]
fn integer_kernels() -> Result<(), TensorError> {
    init_logger();
    let mut a = Tensor::from_shape_vec(&[3], vec![250u8, 10, 9])?;
    a.add_scalar_(10)?;
    assert_eq!(a.to_vec::<u8>()?, vec![4, 20, 19]);

    let zero = Tensor::zeros(&[3], TensorOptions::default().with_scalar_type(ScalarType::Byte))?;
    assert_eq!(a.div_(&zero).err(), Some(TensorError::DivisionByZero));
    assert_eq!(a.div_scalar_(0).err(), Some(TensorError::DivisionByZero));
    assert_eq!(a.to_vec::<u8>()?, vec![4, 20, 19]);

    a.div_scalar_(2)?;
    assert_eq!(a.to_vec::<u8>()?, vec![2, 10, 9]);
    Ok(())
}

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use dyntensor::{ScalarType, Tensor};

fn benchmark_clone_drop(c: &mut Criterion) {
    let tensor = Tensor::from_shape_vec(&[100, 100], vec![1.0f32; 10000]).unwrap();

    c.bench_function("handle clone and drop", |b| {
        b.iter(|| {
            let _clone = black_box(&tensor).clone();
        })
    });
}

fn benchmark_assign(c: &mut Criterion) {
    let a = Tensor::from_shape_vec(&[100, 100], vec![1.0f32; 10000]).unwrap();
    let b_tensor = Tensor::from_shape_vec(&[100, 100], vec![2.0f32; 10000]).unwrap();

    c.bench_function("handle assign", |b| {
        let mut target = a.clone();
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            target.assign(black_box(if flip { &b_tensor } else { &a }));
        })
    });
}

fn benchmark_to_type(c: &mut Criterion) {
    let tensor = Tensor::from_shape_vec(&[100, 100], vec![1.0f32; 10000]).unwrap();

    c.bench_function("to_scalar_type same type", |b| {
        b.iter(|| {
            let _same = black_box(&tensor)
                .to_scalar_type(ScalarType::Float)
                .unwrap();
        })
    });

    c.bench_function("to_scalar_type f32 to f64", |b| {
        b.iter(|| {
            let _converted = black_box(&tensor)
                .to_scalar_type(ScalarType::Double)
                .unwrap();
        })
    });
}

fn benchmark_accessor_get(c: &mut Criterion) {
    let tensor = Tensor::from_shape_vec(&[100, 100], vec![1.0f32; 10000]).unwrap();

    c.bench_function("accessor get", |b| {
        let acc = tensor.accessor::<f32, 2>().unwrap();
        b.iter(|| {
            let mut sum = 0.0f32;
            for i in 0..100 {
                for j in 0..100 {
                    sum += acc.get(black_box([i, j])).unwrap_or_default();
                }
            }
            sum
        })
    });
}

fn benchmark_add_inplace(c: &mut Criterion) {
    let tensor1 = Tensor::from_shape_vec(&[100, 100], vec![1.0f32; 10000]).unwrap();
    let tensor2 = Tensor::from_shape_vec(&[100, 100], vec![2.0f32; 10000]).unwrap();

    c.bench_function("add_ inplace", |b| {
        let mut t = tensor1.clone();
        b.iter(|| {
            t.add_(black_box(&tensor2)).unwrap();
        })
    });
}

criterion_group!(
    benches,
    benchmark_clone_drop,
    benchmark_assign,
    benchmark_to_type,
    benchmark_accessor_get,
    benchmark_add_inplace
);
criterion_main!(benches);

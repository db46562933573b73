//! Criterion micro-benchmarks for array and hash set operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use malm_alloc::Heap;
use malm_collections::{Array, RobinHood};
use malm_core::U64Keys;

fn bench_array_push(c: &mut Criterion) {
    let heap = Heap::new();
    c.bench_function("array_push_4096_from_cap_1", |b| {
        b.iter(|| {
            let mut array: Array<'_, u64, Heap> = Array::new(&heap, 1).unwrap();
            for value in 0..4096u64 {
                array.push(value).unwrap();
            }
            black_box(array.len());
        });
    });
    c.bench_function("array_push_4096_preallocated", |b| {
        b.iter(|| {
            let mut array: Array<'_, u64, Heap> = Array::new(&heap, 4096).unwrap();
            for value in 0..4096u64 {
                array.push(value).unwrap();
            }
            black_box(array.len());
        });
    });
}

fn bench_set_insert(c: &mut Criterion) {
    let heap = Heap::new();
    let keys = malm_bench::keys(42, 1024);
    c.bench_function("robin_hood_insert_1024", |b| {
        b.iter(|| {
            let mut set = RobinHood::new(&heap, 16, U64Keys).unwrap();
            for &key in &keys {
                set.insert((key, key)).unwrap();
            }
            black_box(set.len());
        });
    });
}

fn bench_set_get(c: &mut Criterion) {
    let heap = Heap::new();
    let keys = malm_bench::keys(42, 1024);
    let misses = malm_bench::keys(1337, 1024);
    let mut set = RobinHood::new(&heap, 16, U64Keys).unwrap();
    for &key in &keys {
        set.insert((key, key)).unwrap();
    }
    c.bench_function("robin_hood_get_hit_1024", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(set.get(key));
            }
        });
    });
    c.bench_function("robin_hood_get_miss_1024", |b| {
        b.iter(|| {
            for key in &misses {
                black_box(set.get(key));
            }
        });
    });
}

fn bench_set_churn(c: &mut Criterion) {
    let heap = Heap::new();
    let keys = malm_bench::keys(7, 512);
    c.bench_function("robin_hood_insert_remove_512", |b| {
        let mut set = RobinHood::new(&heap, 1024, U64Keys).unwrap();
        b.iter(|| {
            for &key in &keys {
                set.insert((key, key)).unwrap();
            }
            for key in &keys {
                black_box(set.remove(key));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_array_push,
    bench_set_insert,
    bench_set_get,
    bench_set_churn,
);
criterion_main!(benches);

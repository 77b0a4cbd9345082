use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parkr::clock::ManualClock;
use parkr::models::Registry;
use parkr::storage::MemoryStore;

fn full_lot(size: usize) -> Registry {
    let clock = Arc::new(ManualClock::new(SystemTime::now()));
    let mut registry = Registry::open(Arc::new(MemoryStore::new()), clock.clone());
    for i in 0..size {
        registry
            .register(&format!("PLT{:05}", i), "Toyota", "Corolla", "Red")
            .unwrap();
        clock.advance(Duration::from_millis(750));
    }
    registry
}

fn bench_list(c: &mut Criterion) {
    let registry = full_lot(500);
    c.bench_function("list 500 vehicles", |b| {
        b.iter(|| black_box(registry.list()))
    });
}

fn bench_persist(c: &mut Criterion) {
    let mut registry = full_lot(500);
    c.bench_function("persist 500 vehicles", |b| {
        b.iter(|| registry.persist().unwrap())
    });
}

criterion_group!(benches, bench_list, bench_persist);
criterion_main!(benches);

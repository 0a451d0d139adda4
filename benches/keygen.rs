//! Throughput Benchmark for flashdrop
//!
//! This benchmark measures the key codec and the in-memory backend
//! under various workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flashdrop::key::{find_free_key, generate_key, validate_key};
use flashdrop::storage::{MemoryStorage, Metadata, Storage};
use std::sync::Arc;

/// Benchmark key generation and validation
fn bench_key_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("generate_key", |b| {
        b.iter(|| black_box(generate_key()));
    });

    group.bench_function("validate_key", |b| {
        let key = generate_key();
        b.iter(|| black_box(validate_key(&key)));
    });

    group.finish();
}

/// Benchmark the free-key search against an empty backend (the common case:
/// a single probe that misses)
fn bench_find_free_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(MemoryStorage::new());

    let mut group = c.benchmark_group("find_free_key");
    group.throughput(Throughput::Elements(1));

    group.bench_function("empty_backend", |b| {
        b.iter(|| {
            let key = rt.block_on(find_free_key(store.as_ref())).unwrap();
            black_box(key);
        });
    });

    group.finish();
}

/// Benchmark save and read on the in-memory backend
fn bench_memory_backend(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("memory_backend");
    group.throughput(Throughput::Elements(1));

    group.bench_function("save_small", |b| {
        let store = MemoryStorage::new();
        b.iter(|| {
            rt.block_on(async {
                let mut payload: &[u8] = b"small payload";
                store
                    .save("lozuvakemirodatupesy", Metadata::new("text/plain"), &mut payload)
                    .await
                    .unwrap();
            });
        });
    });

    group.bench_function("save_large", |b| {
        let store = MemoryStorage::new();
        let payload = vec![0u8; 64 * 1024]; // 64KB payload
        b.iter(|| {
            rt.block_on(async {
                let mut reader: &[u8] = &payload;
                store
                    .save("lozuvakemirodatupesy", Metadata::new("application/octet-stream"), &mut reader)
                    .await
                    .unwrap();
            });
        });
    });

    group.bench_function("read_small", |b| {
        let store = MemoryStorage::new();
        rt.block_on(async {
            let mut payload: &[u8] = b"small payload";
            store
                .save("lozuvakemirodatupesy", Metadata::new("text/plain"), &mut payload)
                .await
                .unwrap();
        });
        b.iter(|| {
            rt.block_on(async {
                let mut sink = Vec::new();
                store.read("lozuvakemirodatupesy", &mut sink).await.unwrap();
                black_box(sink);
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_key_codec, bench_find_free_key, bench_memory_backend);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::time::Duration;
use tether::core::codec::SecretCodec;
use tether::core::sync::fingerprint;

/// A document with `n` line items.
fn generate_document(n: usize) -> Value {
    let items: Vec<Value> = (0..n)
        .map(|i| json!({"id": i, "sku": format!("SKU-{i}"), "qty": i % 7, "price": "9.99"}))
        .collect();
    json!({"shop": "bench.example", "currency": "EUR", "items": items})
}

/// Benchmark state token issuance and validation.
fn bench_state_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_token");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let codec = SecretCodec::new(b"bench-secret");
    let payload = "6f1c2d3e-0000-4000-8000-000000000001";

    group.bench_function("generate", |b| {
        b.iter(|| black_box(codec.generate(black_box(Some(payload))).unwrap()));
    });

    let token = codec.generate(Some(payload)).unwrap();
    group.bench_function("validate", |b| {
        b.iter(|| black_box(codec.validate(black_box(&token), 300).unwrap()));
    });

    group.finish();
}

/// Benchmark canonical fingerprinting with growing documents.
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    group.sample_size(50);

    for n in [10, 100, 1_000] {
        let document = generate_document(n);
        let size = serde_json::to_vec(&document).map(|v| v.len()).unwrap_or(0);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("items", n), &document, |b, doc| {
            b.iter(|| black_box(fingerprint(black_box(doc))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_state_tokens, bench_fingerprint);
criterion_main!(benches);

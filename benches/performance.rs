//! Performance benchmarks for reconciliation.

use billing_reconciler::{
    ProductFamily, Purchase, Reconciler, SavedState, SkuDetails, SkuId, Snapshot,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn code(i: usize) -> String {
    format!("sub_{:04}", i)
}

/// Snapshot with `catalog` tiers of which every other one is owned.
fn snapshot(catalog: usize) -> Snapshot {
    let mut snapshot = Snapshot::new().with_support(ProductFamily::Subscription, true);
    for i in 0..catalog {
        snapshot = snapshot.with_sku(
            SkuDetails::new(SkuId::subscription(code(i)), format!("Tier {}", i))
                .with_price("$1.99", 1_990_000, "USD"),
        );
        if i % 2 == 0 {
            snapshot = snapshot.with_purchase(Purchase::purchased(
                SkuId::subscription(code(i)),
                format!("token-{}", i),
            ));
        }
    }
    snapshot
}

/// Benchmark reconciling a fresh snapshot against a loaded selection
fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for catalog in [10, 100, 1000] {
        let first = snapshot(catalog);
        // Drop a quarter of the owned tiers in the second snapshot
        let mut second = first.clone();
        second.purchases.retain(|purchase| {
            let n: usize = purchase.id.code[4..].parse().unwrap_or(0);
            n % 8 != 0
        });

        group.bench_with_input(
            BenchmarkId::new("catalog_size", catalog),
            &(first, second),
            |b, (first, second)| {
                b.iter(|| {
                    let mut reconciler = Reconciler::new(ProductFamily::Subscription);
                    reconciler.reconcile(first);
                    for i in (0..catalog).step_by(2) {
                        reconciler.toggle(&SkuId::subscription(code(i)), true);
                    }
                    black_box(reconciler.reconcile(second));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the first-load merge of a restored selection
fn bench_restore_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("restore_merge");

    for restored in [10, 100, 500] {
        let loaded = snapshot(1000);
        let codes: Vec<String> = (0..restored).map(|i| code(i * 2)).collect();

        group.bench_with_input(
            BenchmarkId::new("restored_codes", restored),
            &codes,
            |b, codes| {
                b.iter(|| {
                    let mut reconciler = Reconciler::new(ProductFamily::Subscription);
                    reconciler.restore(codes.iter().cloned());
                    black_box(reconciler.reconcile(&loaded));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark snapshot fingerprinting
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for catalog in [10, 100, 1000] {
        let snapshot = snapshot(catalog);
        group.bench_with_input(
            BenchmarkId::new("catalog_size", catalog),
            &snapshot,
            |b, snapshot| {
                b.iter(|| black_box(snapshot.fingerprint()));
            },
        );
    }

    group.finish();
}

/// Benchmark encoding and decoding saved state
fn bench_saved_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("saved_state");

    for selected in [1, 50, 500] {
        let mut state = SavedState::new();
        state.put("selected_subscriptions", (0..selected).map(code).collect());
        let bytes = state.encode().unwrap();

        group.bench_with_input(BenchmarkId::new("encode", selected), &state, |b, state| {
            b.iter(|| black_box(state.encode().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", selected), &bytes, |b, bytes| {
            b.iter(|| black_box(SavedState::decode(bytes).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reconcile,
    bench_restore_merge,
    bench_fingerprint,
    bench_saved_state
);
criterion_main!(benches);

//! Benchmarks for trellis-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::{computed, effect, signal, Computed, Signal};

// =============================================================================
// SIGNAL BENCHMARKS
// =============================================================================

fn bench_signal_get(c: &mut Criterion) {
    let s = signal(42i32);
    c.bench_function("signal_get", |b| b.iter(|| black_box(s.get())));
}

fn bench_signal_set(c: &mut Criterion) {
    let s = signal(0i32);
    let mut n = 0;
    c.bench_function("signal_set", |b| {
        b.iter(|| {
            n += 1;
            s.set(black_box(n))
        })
    });
}

fn bench_signal_set_same_value(c: &mut Criterion) {
    let s = signal(42i32);
    let _reader = {
        let s = s.clone();
        let d = computed(move || s.get() + 1);
        d.get();
        d
    };
    c.bench_function("signal_set_same_value", |b| b.iter(|| s.set(black_box(42))));
}

// =============================================================================
// COMPUTED BENCHMARKS
// =============================================================================

fn bench_computed_get_cached(c: &mut Criterion) {
    let s = signal(42i32);
    let d = {
        let s = s.clone();
        computed(move || s.get() * 2)
    };
    d.get();

    c.bench_function("computed_get_cached", |b| b.iter(|| black_box(d.get())));
}

fn bench_computed_get_dirty(c: &mut Criterion) {
    let s = signal(0i32);
    let d = {
        let s = s.clone();
        computed(move || s.get() * 2)
    };
    let mut n = 0;

    c.bench_function("computed_get_dirty", |b| {
        b.iter(|| {
            n += 1;
            s.set(n);
            black_box(d.get())
        })
    });
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [10usize, 100] {
        let s = signal(0i32);
        let mut tail: Computed<i32> = {
            let s = s.clone();
            computed(move || s.get())
        };
        for _ in 1..depth {
            let prev = tail;
            tail = computed(move || prev.get() + 1);
        }
        let mut n = 0;

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                n += 1;
                s.set(n);
                black_box(tail.get())
            })
        });
    }

    group.finish();
}

fn bench_diamond_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("diamond_fan_in");

    for width in [4, 32] {
        let s = signal(0i32);
        let branches: Vec<Computed<i32>> = (0..width)
            .map(|i| {
                let s = s.clone();
                computed(move || s.get() + i)
            })
            .collect();
        let sum = {
            let branches = branches.clone();
            computed(move || branches.iter().map(Computed::get).sum::<i32>())
        };
        let mut n = 0;

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| {
                n += 1;
                s.set(n);
                black_box(sum.get())
            })
        });
    }

    group.finish();
}

// =============================================================================
// EFFECT BENCHMARKS
// =============================================================================

fn bench_effect_rerun(c: &mut Criterion) {
    let s = signal(0i32);
    let e = {
        let s = s.clone();
        effect(move || {
            black_box(s.get());
        })
    };
    let mut n = 0;

    c.bench_function("effect_rerun", |b| {
        b.iter(|| {
            n += 1;
            s.set(n);
            e.run_if_dirty()
        })
    });
}

fn bench_many_signals(c: &mut Criterion) {
    c.bench_function("create_1000_signals", |b| {
        b.iter(|| {
            let signals: Vec<Signal<i32>> = (0..1000).map(signal).collect();
            black_box(signals)
        })
    });
}

criterion_group!(
    signal_benches,
    bench_signal_get,
    bench_signal_set,
    bench_signal_set_same_value,
);

criterion_group!(
    computed_benches,
    bench_computed_get_cached,
    bench_computed_get_dirty,
    bench_computed_chain,
    bench_diamond_fan_in,
);

criterion_group!(effect_benches, bench_effect_rerun, bench_many_signals);

criterion_main!(signal_benches, computed_benches, effect_benches);

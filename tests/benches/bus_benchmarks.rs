//! # Message Bus Benchmarks
//!
//! | Operation | Shape | Target |
//! |-----------|-------|--------|
//! | `Tag::parse` | 4 segments | < 1µs |
//! | `register` + `unregister` | 1 000 listeners on one tag | < 1µs each |
//! | `broadcast` | 4-deep tag, listeners on every level | < 10µs for 64 listeners |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use message_bus::{MatchMode, MessageBus, Tag};
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
struct Damage {
    amount: u64,
}

fn tag(s: &str) -> Tag {
    Tag::parse(s).expect("benchmark tag")
}

fn bench_tag_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("tag");

    group.bench_function("parse_4_segments", |b| {
        b.iter(|| black_box(Tag::parse(black_box("Combat.Damage.Taken.Crit"))))
    });

    let deep = tag("Combat.Damage.Taken.Crit");
    group.bench_function("ancestors_4_segments", |b| {
        b.iter(|| black_box(deep.ancestors()))
    });

    group.finish();
}

fn bench_register_unregister(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("register_unregister_single", |b| {
        let bus = MessageBus::new();
        let t = tag("UI.Notify");
        b.iter(|| {
            let handle = bus.register::<Damage, _>(&t, MatchMode::Exact, |_, _| {});
            bus.unregister(&handle);
        })
    });

    group.bench_function("unregister_random_of_1000", |b| {
        let t = tag("UI.Notify");
        b.iter_batched(
            || {
                let bus = MessageBus::new();
                let mut handles: Vec<_> = (0..1_000)
                    .map(|_| bus.register::<Damage, _>(&t, MatchMode::Exact, |_, _| {}))
                    .collect();
                handles.shuffle(&mut rand::thread_rng());
                (bus, handles)
            },
            |(bus, handles)| {
                for handle in &handles {
                    bus.unregister(handle);
                }
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    group.measurement_time(Duration::from_secs(5));

    let levels = ["Combat", "Combat.Damage", "Combat.Damage.Taken", "Combat.Damage.Taken.Crit"];
    for per_level in [1, 4, 16] {
        let bus = MessageBus::new();
        let total = Arc::new(AtomicU64::new(0));
        for level in levels {
            for _ in 0..per_level {
                let sink = total.clone();
                bus.register::<Damage, _>(
                    &tag(level),
                    MatchMode::InclusiveAncestors,
                    move |_, d| {
                        sink.fetch_add(d.amount, Ordering::Relaxed);
                    },
                );
            }
        }

        let listeners = per_level * levels.len();
        let leaf = tag("Combat.Damage.Taken.Crit");
        let payload = Damage { amount: 1 };
        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(
            BenchmarkId::new("inclusive_4_levels", listeners),
            &listeners,
            |b, _| b.iter(|| bus.broadcast(&leaf, black_box(&payload))),
        );
    }

    let bus = MessageBus::new();
    let unheard = tag("Nobody.Listens.Here");
    group.bench_function("no_listeners", |b| {
        b.iter(|| bus.broadcast(&unheard, black_box(&Damage { amount: 1 })))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tag_parse,
    bench_register_unregister,
    bench_broadcast
);
criterion_main!(benches);

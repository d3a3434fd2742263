//! # Concurrency
//!
//! The bus is shared across threads behind `Arc`. Broadcasts from several
//! threads, listener churn during broadcasts, and the accepted
//! unregister-vs-snapshot race.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use message_bus::{MatchMode, MessageBus, Metrics};
    use rand::Rng;

    use crate::integration::{tag, Damage};

    #[test]
    fn test_parallel_broadcasts_all_delivered() {
        let bus = Arc::new(MessageBus::new());
        let total = Arc::new(AtomicU64::new(0));

        let sink = total.clone();
        bus.register::<Damage, _>(&tag("Combat"), MatchMode::InclusiveAncestors, move |_, d| {
            sink.fetch_add(u64::from(d.amount), Ordering::Relaxed);
        });

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let bus = bus.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        bus.broadcast(&tag("Combat.Damage"), &Damage { amount: 1 })
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(total.load(Ordering::Relaxed), 8_000);
    }

    #[test]
    fn test_churn_during_broadcasts() {
        let metrics = Arc::new(Metrics::new());
        let bus = Arc::new(MessageBus::with_metrics(Default::default(), metrics.clone()));
        let barrier = Arc::new(Barrier::new(3));

        let churn: Vec<_> = (0..2)
            .map(|_| {
                let (bus, barrier) = (bus.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    let mut rng = rand::thread_rng();
                    for _ in 0..500 {
                        let t = if rng.gen_bool(0.5) { "Combat" } else { "Combat.Damage" };
                        let handle = bus.register::<Damage, _>(
                            &tag(t),
                            MatchMode::InclusiveAncestors,
                            |_, _| {},
                        );
                        bus.unregister(&handle);
                    }
                })
            })
            .collect();

        barrier.wait();
        for _ in 0..2_000 {
            bus.broadcast(&tag("Combat.Damage.Taken"), &Damage { amount: 1 })
                .unwrap();
        }
        for t in churn {
            t.join().unwrap();
        }

        assert_eq!(bus.channel_count(), 0);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.listeners_registered, 1_000);
        assert_eq!(snapshot.listeners_active, 0);
        assert_eq!(snapshot.broadcasts, 2_000);
    }

    #[test]
    fn test_accepted_race_at_most_one_late_delivery() {
        // A broadcast that resolved before `unregister` returned may still
        // deliver once; any broadcast started afterwards must not.
        for _ in 0..50 {
            let bus = Arc::new(MessageBus::new());
            let hits = Arc::new(AtomicU64::new(0));
            let sink = hits.clone();
            let handle = bus.register::<Damage, _>(&tag("A"), MatchMode::Exact, move |_, _| {
                sink.fetch_add(1, Ordering::SeqCst);
            });

            let barrier = Arc::new(Barrier::new(2));
            let sender = {
                let (bus, barrier) = (bus.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    bus.broadcast(&tag("A"), &Damage { amount: 1 }).unwrap();
                })
            };

            barrier.wait();
            bus.unregister(&handle);
            sender.join().unwrap();

            let settled = hits.load(Ordering::SeqCst);
            assert!(settled <= 1);
            bus.broadcast(&tag("A"), &Damage { amount: 1 }).unwrap();
            assert_eq!(hits.load(Ordering::SeqCst), settled);
            assert_eq!(bus.listener_count(&tag("A")), 0);
        }
    }
}

//! # Re-entrancy
//!
//! Listener callbacks that mutate the bus while a broadcast is running.
//! None of these may deadlock, crash, corrupt the registry, or change the
//! set of listeners visited by the pass already in flight.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};

    use message_bus::{ListenerHandle, MatchMode, MessageBus};
    use parking_lot::Mutex;

    use crate::integration::{tag, Notice};

    type Slot = Arc<Mutex<Option<ListenerHandle>>>;

    fn slot() -> Slot {
        Arc::new(Mutex::new(None))
    }

    #[test]
    fn test_self_unregister_invoked_once() {
        let bus = Arc::new(MessageBus::new());
        let own = slot();
        let calls = Arc::new(Mutex::new(0_u32));

        let weak: Weak<MessageBus> = Arc::downgrade(&bus);
        let (me, count) = (own.clone(), calls.clone());
        let handle = bus.register::<Notice, _>(&tag("UI.Notify"), MatchMode::Exact, move |_, _| {
            *count.lock() += 1;
            let handle = me.lock().clone();
            if let (Some(bus), Some(handle)) = (weak.upgrade(), handle) {
                bus.unregister(&handle);
            }
        });
        *own.lock() = Some(handle);

        for _ in 0..3 {
            bus.broadcast(&tag("UI.Notify"), &Notice::new("x")).unwrap();
        }
        assert_eq!(*calls.lock(), 1);
        assert_eq!(bus.channel_count(), 0);
    }

    #[test]
    fn test_unregister_later_listener_mid_pass() {
        // L1 removes L2 during the pass. L2 was already in the snapshot, so
        // it still runs this time, and never again.
        let bus = Arc::new(MessageBus::new());
        let victim = slot();
        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));

        let weak = Arc::downgrade(&bus);
        let (target, sink) = (victim.clone(), order.clone());
        bus.register::<Notice, _>(&tag("A"), MatchMode::Exact, move |_, _| {
            sink.lock().push("l1");
            let handle = target.lock().take();
            if let (Some(bus), Some(handle)) = (weak.upgrade(), handle) {
                bus.unregister(&handle);
            }
        });
        let sink = order.clone();
        let l2 = bus.register::<Notice, _>(&tag("A"), MatchMode::Exact, move |_, _| {
            sink.lock().push("l2");
        });
        *victim.lock() = Some(l2);

        bus.broadcast(&tag("A"), &Notice::new("first")).unwrap();
        assert_eq!(*order.lock(), vec!["l1", "l2"]);

        bus.broadcast(&tag("A"), &Notice::new("second")).unwrap();
        assert_eq!(*order.lock(), vec!["l1", "l2", "l1"]);
        assert_eq!(bus.listener_count(&tag("A")), 1);
    }

    #[test]
    fn test_register_during_pass_not_visited() {
        let bus = Arc::new(MessageBus::new());
        let late_hits = Arc::new(Mutex::new(0_u32));
        let registered = Arc::new(Mutex::new(false));

        let weak = Arc::downgrade(&bus);
        let (late, once) = (late_hits.clone(), registered.clone());
        bus.register::<Notice, _>(&tag("A.B"), MatchMode::Exact, move |_, _| {
            let mut done = once.lock();
            if *done {
                return;
            }
            *done = true;
            if let Some(bus) = weak.upgrade() {
                let late = late.clone();
                // Lands on an ancestor that this pass would otherwise visit.
                bus.register::<Notice, _>(&tag("A"), MatchMode::InclusiveAncestors, move |_, _| {
                    *late.lock() += 1;
                });
            }
        });

        bus.broadcast(&tag("A.B"), &Notice::new("first")).unwrap();
        assert_eq!(*late_hits.lock(), 0);

        bus.broadcast(&tag("A.B"), &Notice::new("second")).unwrap();
        assert_eq!(*late_hits.lock(), 1);
    }

    #[test]
    fn test_nested_broadcast_from_callback() {
        let bus = Arc::new(MessageBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&bus);
        bus.register::<Notice, _>(&tag("Quest.Start"), MatchMode::Exact, move |_, n| {
            if let Some(bus) = weak.upgrade() {
                bus.broadcast(&tag("Quest.Log"), &Notice::new(&format!("started {}", n.text)))
                    .unwrap();
            }
        });
        let sink = seen.clone();
        bus.register::<Notice, _>(&tag("Quest.Log"), MatchMode::Exact, move |_, n| {
            sink.lock().push(n.text.clone());
        });

        bus.broadcast(&tag("Quest.Start"), &Notice::new("dragon"))
            .unwrap();
        assert_eq!(*seen.lock(), vec!["started dragon"]);
    }

    #[test]
    fn test_clear_from_callback() {
        let bus = Arc::new(MessageBus::new());
        let later = Arc::new(Mutex::new(0_u32));

        let weak = Arc::downgrade(&bus);
        bus.register::<Notice, _>(&tag("A"), MatchMode::Exact, move |_, _| {
            if let Some(bus) = weak.upgrade() {
                bus.clear();
            }
        });
        let sink = later.clone();
        bus.register::<Notice, _>(&tag("A"), MatchMode::Exact, move |_, _| {
            *sink.lock() += 1;
        });

        bus.broadcast(&tag("A"), &Notice::new("x")).unwrap();
        assert_eq!(*later.lock(), 1);
        assert_eq!(bus.channel_count(), 0);

        bus.broadcast(&tag("A"), &Notice::new("y")).unwrap();
        assert_eq!(*later.lock(), 1);
    }

    #[test]
    fn test_double_unregister_same_as_once() {
        let bus = MessageBus::new();
        let keep = bus.register::<Notice, _>(&tag("A"), MatchMode::Exact, |_, _| {});
        let drop_me = bus.register::<Notice, _>(&tag("A"), MatchMode::Exact, |_, _| {});

        bus.unregister(&drop_me);
        bus.unregister(&drop_me);

        assert_eq!(bus.listener_count(&tag("A")), 1);
        assert_eq!(
            bus.registry().resolve(&tag("A")).handles(),
            vec![keep]
        );
    }
}

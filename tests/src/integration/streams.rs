//! # Async Listeners
//!
//! `MessageBus::listen` bridges synchronous broadcasts into tokio tasks.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use message_bus::{MatchMode, MessageBus};
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use crate::integration::{tag, Damage, Notice};

    #[tokio::test]
    async fn test_task_consumes_stream() {
        let bus = Arc::new(MessageBus::new());
        let stream = bus.listen::<Damage>(&tag("Combat"), MatchMode::InclusiveAncestors);

        let consumer = tokio::spawn(async move {
            stream
                .take(3)
                .fold(0_u32, |total, (_, damage)| total + damage.amount)
                .await
        });

        for (t, amount) in [("Combat.Damage", 1), ("Combat", 2), ("Combat.Damage.Crit", 4)] {
            bus.broadcast(&tag(t), &Damage { amount }).unwrap();
        }

        let total = timeout(Duration::from_secs(1), consumer)
            .await
            .expect("timeout")
            .expect("consumer panicked");
        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn test_stream_and_sync_listener_share_order() {
        let bus = MessageBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let sink = order.clone();
        bus.register::<Notice, _>(&tag("UI.Notify"), MatchMode::Exact, move |_, n| {
            sink.lock().push(n.text.clone());
        });
        let mut stream = bus.listen::<Notice>(&tag("UI"), MatchMode::InclusiveAncestors);

        bus.broadcast(&tag("UI.Notify"), &Notice::new("a")).unwrap();
        bus.broadcast(&tag("UI.Notify"), &Notice::new("b")).unwrap();

        let mut streamed = Vec::new();
        while let Ok(Some((channel, notice))) = stream.try_recv() {
            assert_eq!(channel, tag("UI.Notify"));
            streamed.push(notice.text);
        }
        assert_eq!(streamed, *order.lock());
    }

    #[tokio::test]
    async fn test_type_mismatch_does_not_reach_stream() {
        let bus = MessageBus::new();
        let mut stream = bus.listen::<Notice>(&tag("A"), MatchMode::Exact);

        let err = bus.broadcast(&tag("A"), &Damage { amount: 1 }).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(stream.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_bus_drop_ends_stream() {
        let bus = MessageBus::new();
        let mut stream = bus.listen::<Notice>(&tag("A"), MatchMode::Exact);
        bus.broadcast(&tag("A"), &Notice::new("last")).unwrap();
        drop(bus);

        let (_, notice) = stream.recv().await.expect("queued message lost");
        assert_eq!(notice.text, "last");
        assert!(stream.recv().await.is_none());
    }
}

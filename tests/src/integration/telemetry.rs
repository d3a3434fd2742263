//! # Telemetry Wiring
//!
//! A bus built with the Prometheus recorder feeds the global collectors.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use message_bus::{BusConfig, MatchMode, MessageBus};
    use message_telemetry::metrics::{LISTENER_ERRORS, LISTENER_INVOCATIONS};
    use message_telemetry::{encode_metrics, register_metrics, PrometheusRecorder};

    use crate::integration::{tag, Damage, Notice};

    #[test]
    fn test_prometheus_recorder_counts_broadcasts() -> anyhow::Result<()> {
        register_metrics()?;
        let bus = MessageBus::with_metrics(
            BusConfig::default().with_name("telemetry-it"),
            Arc::new(PrometheusRecorder),
        );

        let invocations = LISTENER_INVOCATIONS.with_label_values(&["Telemetry"]).get();
        let mismatches = LISTENER_ERRORS
            .with_label_values(&["Telemetry", "type_mismatch"])
            .get();

        bus.register::<Notice, _>(&tag("Telemetry.Probe"), MatchMode::Exact, |_, _| {});
        bus.register::<Damage, _>(&tag("Telemetry.Probe"), MatchMode::Exact, |_, _| {});
        let result = bus.broadcast(&tag("Telemetry.Probe"), &Notice::new("ping"));
        assert!(result.is_err());

        assert_eq!(
            LISTENER_INVOCATIONS.with_label_values(&["Telemetry"]).get(),
            invocations + 1.0
        );
        assert_eq!(
            LISTENER_ERRORS
                .with_label_values(&["Telemetry", "type_mismatch"])
                .get(),
            mismatches + 1.0
        );

        let text = encode_metrics()?;
        assert!(text.contains("message_bus_broadcasts_total"));
        Ok(())
    }
}

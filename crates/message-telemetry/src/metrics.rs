//! Prometheus metrics for the message bus.
//!
//! All metrics follow the naming convention: `message_bus_<metric>_<unit>`.
//! Per-channel series are labelled with the root segment of the broadcast
//! tag (`Combat` for `Combat.Damage.Taken`) to keep cardinality bounded.

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use message_bus::{ListenerErrorKind, MetricsRecorder};
use message_types::Tag;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Broadcasts by channel root
    pub static ref BROADCASTS: CounterVec = CounterVec::new(
        Opts::new("message_bus_broadcasts_total", "Total broadcasts by channel root"),
        &["channel"]
    ).expect("metric creation failed");

    /// Broadcasts that reached no listener
    pub static ref BROADCASTS_UNHEARD: Counter = Counter::new(
        "message_bus_broadcasts_unheard_total",
        "Broadcasts that resolved no listener"
    ).expect("metric creation failed");

    /// Broadcast duration, resolve plus every callback
    pub static ref BROADCAST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "message_bus_broadcast_duration_seconds",
            "Time spent delivering one broadcast"
        ).buckets(vec![
            0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05,
        ])
    ).expect("metric creation failed");

    /// Listener callbacks run
    pub static ref LISTENER_INVOCATIONS: CounterVec = CounterVec::new(
        Opts::new("message_bus_listener_invocations_total", "Listener callbacks run"),
        &["channel"]
    ).expect("metric creation failed");

    /// Listener failures by kind
    pub static ref LISTENER_ERRORS: CounterVec = CounterVec::new(
        Opts::new("message_bus_listener_errors_total", "Listener failures by channel root and kind"),
        &["channel", "kind"]  // kind: type_mismatch/invocation/panicked
    ).expect("metric creation failed");

    /// Currently registered listeners
    pub static ref LISTENERS_REGISTERED: Gauge = Gauge::new(
        "message_bus_listeners_registered",
        "Number of currently registered listeners"
    ).expect("metric creation failed");
}

/// Handle proving the collectors are registered.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Calling this again is harmless: collectors that are already registered
/// are skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BROADCASTS.clone()),
        Box::new(BROADCASTS_UNHEARD.clone()),
        Box::new(BROADCAST_DURATION.clone()),
        Box::new(LISTENER_INVOCATIONS.clone()),
        Box::new(LISTENER_ERRORS.clone()),
        Box::new(LISTENERS_REGISTERED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// [`MetricsRecorder`] backed by the global Prometheus collectors.
///
/// ```rust,ignore
/// let bus = MessageBus::with_metrics(BusConfig::from_env(), Arc::new(PrometheusRecorder));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRecorder;

fn channel(tag: &Tag) -> Tag {
    tag.root()
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_registered(&self, _: &Tag) {
        LISTENERS_REGISTERED.inc();
    }

    fn record_unregistered(&self, _: &Tag) {
        LISTENERS_REGISTERED.dec();
    }

    fn record_broadcast(&self, tag: &Tag, resolved: usize, duration: Duration) {
        BROADCASTS
            .with_label_values(&[channel(tag).as_str()])
            .inc();
        if resolved == 0 {
            BROADCASTS_UNHEARD.inc();
        }
        BROADCAST_DURATION.observe(duration.as_secs_f64());
    }

    fn record_invocation(&self, tag: &Tag) {
        LISTENER_INVOCATIONS
            .with_label_values(&[channel(tag).as_str()])
            .inc();
    }

    fn record_listener_error(&self, tag: &Tag, kind: ListenerErrorKind) {
        LISTENER_ERRORS
            .with_label_values(&[channel(tag).as_str(), kind.as_str()])
            .inc();
    }
}

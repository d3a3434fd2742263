//! # Message Telemetry
//!
//! Observability for the message bus.
//!
//! ## Components
//!
//! - **Logging:** `tracing-subscriber` with an `EnvFilter`, pretty or JSON
//! - **Metrics:** Prometheus collectors fed by [`PrometheusRecorder`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use message_bus::{BusConfig, MessageBus};
//! use message_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let telemetry = init_telemetry(TelemetryConfig::from_env())?;
//!     let bus = MessageBus::with_metrics(BusConfig::from_env(), telemetry.recorder());
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `message-bus` | Service name in logs |
//! | `MESSAGE_LOG_LEVEL` | `info` | Log level filter |
//! | `MESSAGE_JSON_LOGS` | `false` | JSON log lines |
//! | `MESSAGE_CONSOLE_OUTPUT` | `true` | Print logs to stdout |
//! | `MESSAGE_METRICS_ENABLED` | `true` | Register Prometheus collectors |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{encode_metrics, register_metrics, MetricsHandle, PrometheusRecorder};

use std::sync::Arc;

use message_bus::{MetricsRecorder, NoOpMetrics};
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so registration failures surface before the subscriber
    // is installed.
    let metrics = if config.metrics_enabled {
        Some(register_metrics()?)
    } else {
        None
    };

    init_logging(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
        metrics,
    })
}

/// Guard that keeps telemetry active.
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
    metrics: Option<MetricsHandle>,
}

impl TelemetryGuard {
    /// Recorder to hand to `MessageBus::with_metrics`: Prometheus when
    /// metrics are enabled, a no-op otherwise.
    #[must_use]
    pub fn recorder(&self) -> Arc<dyn MetricsRecorder> {
        if self.metrics.is_some() {
            Arc::new(PrometheusRecorder)
        } else {
            Arc::new(NoOpMetrics)
        }
    }

    /// Configured service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

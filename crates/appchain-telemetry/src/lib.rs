//! # Appchain Telemetry
//!
//! Observability for the appchain bridge client.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with console or JSON output
//! - **Metrics**: Prometheus counters and histograms held in an explicitly
//!   constructed [`BridgeMetrics`] that is injected into the client
//!
//! ## Usage
//!
//! ```rust,ignore
//! use appchain_telemetry::{init_telemetry, BridgeMetrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config)?;
//! let metrics = std::sync::Arc::new(BridgeMetrics::new()?);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `APPCHAIN_SERVICE_NAME` | `appchain-bridge` | Service name in logs |
//! | `APPCHAIN_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `APPCHAIN_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `APPCHAIN_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
mod metrics;
mod subscriber;

pub use config::TelemetryConfig;
pub use metrics::{BridgeMetrics, SubmitStatus};
pub use subscriber::{init_subscriber, SubscriberGuard};

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize log subscriber: {0}")]
    SubscriberInit(String),

    /// A Prometheus collector could not be created or registered.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Metric text encoding failed.
    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}

/// Initialize logging for the process.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let subscriber = init_subscriber(config)?;
    Ok(TelemetryGuard {
        _subscriber: subscriber,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _subscriber: SubscriberGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for creating a span with component context.
///
/// ```rust,ignore
/// let _span = appchain_telemetry::component_span!("header_pool", current = 42).entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

//! # Appchain Bridge
//!
//! Entry point for the appchain bridge process.
//!
//! ```text
//! appchain-runtime [CONFIG_DIR]
//! ```
//!
//! The configuration directory defaults to `$APPCHAIN_CONFIG_DIR`, then `.`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use appchain_runtime::{BridgeRuntime, ExitReason};
use appchain_telemetry::{init_telemetry, BridgeMetrics, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(&TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("APPCHAIN_CONFIG_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    info!(
        version = appchain_runtime::VERSION,
        config_dir = %config_dir.display(),
        "Starting appchain bridge"
    );

    let metrics = Arc::new(BridgeMetrics::new().context("failed to register metrics")?);
    let mut runtime = BridgeRuntime::initialize(&config_dir, metrics)
        .await
        .with_context(|| format!("failed to initialize from {}", config_dir.display()))?;
    runtime.start().await.context("failed to start bridge")?;

    let reason = runtime.wait_for_exit().await;
    runtime.shutdown().await.context("shutdown failed")?;

    match reason {
        ExitReason::Interrupted => {
            info!("Received Ctrl+C, bridge stopped");
            Ok(())
        }
        ExitReason::Fatal(reason) => {
            error!(%reason, "Bridge stopped on fatal error");
            std::process::exit(1);
        }
    }
}

//! # Header Synchronization Pool
//!
//! Streams finalized block headers to the relay hub in contiguous batches.
//!
//! ```text
//! ┌──────────┐  headers (cap 20)  ┌────────┐  UpdateMeta  ┌───────────┐
//! │ listener │ ─────────────────► │ poster │ ───────────► │ relay hub │
//! └──────────┘                    └────────┘              └───────────┘
//!   every poll_interval             every post_interval
//! ```
//!
//! The listener only fetches up to `latest - finality_threshold`, so headers
//! that may still be reorganized are never posted. `current_num` is the
//! highest height already handed to the poster.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appchain_telemetry::BridgeMetrics;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

use crate::application::fatal::FatalSignal;
use crate::config::HeaderSyncConfig;
use crate::domain::{finalized_upper_bound, BlockHeader, ClientError, HeaderBatch, UpdateMeta};
use crate::ports::outbound::LedgerRpc;

/// Capacity of the listener → poster channel and initial batch size.
pub const HEADER_POOL_CAPACITY: usize = 20;

/// Header listener and poster.
pub struct HeaderPool {
    rpc: Arc<dyn LedgerRpc>,
    poll_interval: Duration,
    post_interval: Duration,
    threshold: u64,
    current_num: AtomicU64,
    fatal: FatalSignal,
    metrics: Arc<BridgeMetrics>,
}

impl HeaderPool {
    /// Create a pool that resumes above `config.start_height`.
    pub fn new(
        config: &HeaderSyncConfig,
        rpc: Arc<dyn LedgerRpc>,
        fatal: FatalSignal,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            rpc,
            poll_interval: config.poll_interval(),
            post_interval: config.post_interval(),
            threshold: config.finality_threshold,
            current_num: AtomicU64::new(config.start_height),
            fatal,
            metrics,
        }
    }

    /// Highest height handed to the poster.
    pub fn current_num(&self) -> u64 {
        self.current_num.load(Ordering::Acquire)
    }

    /// Fetch every finalized header above the cursor and send it on `tx`.
    ///
    /// Returns the number of headers sent. On a fetch error the cursor stays
    /// at the last header sent.
    pub async fn sync_to(
        &self,
        latest: u64,
        tx: &mpsc::Sender<BlockHeader>,
    ) -> Result<u64, ClientError> {
        let Some(upper) = finalized_upper_bound(latest, self.threshold) else {
            debug!(latest, threshold = self.threshold, "Chain below finality threshold");
            return Ok(0);
        };

        let first = self.current_num().saturating_add(1);
        let mut sent = 0;
        for number in first..=upper {
            let header = self.rpc.header_by_number(number).await?;
            tx.send(header)
                .await
                .map_err(|_| ClientError::ChannelClosed("headers"))?;
            self.current_num.store(number, Ordering::Release);
            self.metrics.record_header_fetched();
            sent += 1;
        }
        if sent > 0 {
            debug!(from = first, to = upper, "Fetched headers");
        }
        Ok(sent)
    }

    /// Listener loop. Exits on shutdown, on a closed channel or on a header
    /// fetch failure, which also raises the fatal signal.
    pub async fn run_listener(
        self: Arc<Self>,
        tx: mpsc::Sender<BlockHeader>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let latest = match self.rpc.block_number().await {
                Ok(height) => height,
                Err(e) => {
                    warn!(error = %e, "Failed to query latest height");
                    continue;
                }
            };

            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.sync_to(latest, &tx) => result,
            };
            match result {
                Ok(_) => {}
                Err(ClientError::ChannelClosed(_)) => {
                    debug!("Header channel closed");
                    return;
                }
                Err(e) => {
                    error!(
                        current = self.current_num(),
                        error = %e,
                        "Header fetch failed, stopping listener"
                    );
                    self.fatal.raise(format!("header sync failed: {e}"));
                    return;
                }
            }
        }
        info!(current = self.current_num(), "Header listener stopped");
    }

    /// Poster loop. Flushes the buffered batch every `post_interval`.
    pub async fn run_poster(
        self: Arc<Self>,
        mut headers: mpsc::Receiver<BlockHeader>,
        meta_tx: mpsc::Sender<UpdateMeta>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut batch = HeaderBatch::with_capacity(HEADER_POOL_CAPACITY);
        let mut ticker = interval_at(Instant::now() + self.post_interval, self.post_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                Some(header) = headers.recv() => {
                    if let Err(e) = batch.push(header) {
                        warn!(error = %e, "Dropping header");
                    }
                }
                _ = ticker.tick() => {
                    let count = batch.len();
                    let meta = match batch.flush() {
                        Ok(Some(meta)) => meta,
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode header batch");
                            continue;
                        }
                    };
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        sent = meta_tx.send(meta) => {
                            if sent.is_err() {
                                debug!("Meta channel closed");
                                return;
                            }
                        }
                    }
                    self.metrics.record_batch_posted();
                    info!(count, "Posted header batch");
                }
            }
        }
        info!("Header poster stopped");
    }

    /// Spawn listener and poster.
    pub fn spawn(
        self: &Arc<Self>,
        meta_tx: mpsc::Sender<UpdateMeta>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let (tx, rx) = mpsc::channel(HEADER_POOL_CAPACITY);
        let listener_span =
            appchain_telemetry::component_span!("header_listener", start = self.current_num());
        let poster_span = appchain_telemetry::component_span!(
            "header_poster",
            interval_ms = self.post_interval.as_millis() as u64
        );
        vec![
            tokio::spawn(
                Arc::clone(self)
                    .run_listener(tx, shutdown.clone())
                    .instrument(listener_span),
            ),
            tokio::spawn(
                Arc::clone(self)
                    .run_poster(rx, meta_tx, shutdown)
                    .instrument(poster_span),
            ),
        ]
    }
}

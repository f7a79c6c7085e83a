//! # Event Consumer
//!
//! Polls broker event logs and turns finalized events into interchain
//! messages for the relay hub.
//!
//! The cursor is the highest height whose events were all delivered. A range
//! is only committed after every event in it has been sent, so a restart or
//! a closed channel never skips events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appchain_telemetry::BridgeMetrics;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

use crate::algorithms::convert_event_to_ibtp;
use crate::domain::{finalized_upper_bound, ClientError, Ibtp, IbtpType};
use crate::ports::outbound::LedgerRpc;

/// Event log poller.
pub struct EventConsumer {
    rpc: Arc<dyn LedgerRpc>,
    poll_interval: Duration,
    min_confirm: u64,
    cursor: AtomicU64,
    metrics: Arc<BridgeMetrics>,
}

impl EventConsumer {
    /// Create a consumer that resumes above `start_height`.
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        poll_interval: Duration,
        min_confirm: u64,
        start_height: u64,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            rpc,
            poll_interval,
            min_confirm,
            cursor: AtomicU64::new(start_height),
            metrics,
        }
    }

    /// Highest fully delivered height.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Deliver events of every finalized block above the cursor.
    ///
    /// Returns the number of messages sent.
    pub async fn poll_once(
        &self,
        latest: u64,
        tx: &mpsc::Sender<Ibtp>,
    ) -> Result<usize, ClientError> {
        let Some(upper) = finalized_upper_bound(latest, self.min_confirm) else {
            return Ok(0);
        };
        let from = self.cursor().saturating_add(1);
        if from > upper {
            return Ok(0);
        }

        let events = self.rpc.interchain_events(from, upper).await?;
        let mut sent = 0;
        for event in &events {
            let ibtp = match convert_event_to_ibtp(event, IbtpType::Interchain) {
                Ok(ibtp) => ibtp,
                Err(e) => {
                    appchain_telemetry::log_ibtp_event!(
                        warn,
                        "event_consumer",
                        "Skipping malformed event",
                        event.src_full_id,
                        event.dst_full_id,
                        event.index,
                        block = event.block_number,
                        error = %e
                    );
                    continue;
                }
            };
            appchain_telemetry::log_ibtp_event!(
                info,
                "event_consumer",
                "Emitting interchain message",
                ibtp.from,
                ibtp.to,
                ibtp.index
            );
            tx.send(ibtp)
                .await
                .map_err(|_| ClientError::ChannelClosed("ibtp"))?;
            self.metrics.record_ibtp_emitted();
            sent += 1;
        }

        self.cursor.store(upper, Ordering::Release);
        debug!(from, to = upper, events = events.len(), sent, "Scanned event range");
        Ok(sent)
    }

    /// Poll loop. Exits on shutdown or when the message channel closes.
    pub async fn run(self: Arc<Self>, tx: mpsc::Sender<Ibtp>, mut shutdown: watch::Receiver<bool>) {
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
                result = self.poll_once(latest, &tx) => result,
            };
            match result {
                Ok(_) => {}
                Err(ClientError::ChannelClosed(_)) => {
                    debug!("IBTP channel closed");
                    return;
                }
                Err(e) => warn!(cursor = self.cursor(), error = %e, "Event poll failed"),
            }
        }
        info!(cursor = self.cursor(), "Event consumer stopped");
    }

    /// Spawn the poll loop.
    pub fn spawn(
        self: &Arc<Self>,
        tx: mpsc::Sender<Ibtp>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let span = appchain_telemetry::component_span!("event_consumer", start = self.cursor());
        tokio::spawn(Arc::clone(self).run(tx, shutdown).instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;
    use crate::domain::InterchainEvent;
    use tokio::time::timeout;

    fn event(index: u64, block_number: u64, funcs: &str) -> InterchainEvent {
        InterchainEvent {
            index,
            src_full_id: "1356:eth1:0xsrc".into(),
            dst_full_id: "1356:eth2:0xdst".into(),
            src_contract: "0xsrc".into(),
            dst_contract: "0xdst".into(),
            funcs: funcs.into(),
            args: "a,b".into(),
            encrypt: false,
            block_number,
        }
    }

    fn consumer(ledger: Arc<InMemoryLedger>, min_confirm: u64) -> EventConsumer {
        EventConsumer::new(
            ledger,
            Duration::from_millis(20),
            min_confirm,
            0,
            Arc::new(BridgeMetrics::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_only_finalized_events_are_delivered() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        ledger.push_event(event(1, 5, "set,cb,rb"));
        ledger.push_event(event(2, 9, "set,cb,rb"));
        let consumer = consumer(ledger, 2);
        let (tx, mut rx) = mpsc::channel(8);

        assert_eq!(consumer.poll_once(10, &tx).await.unwrap(), 1);
        assert_eq!(consumer.cursor(), 8);
        let ibtp = rx.recv().await.unwrap();
        assert_eq!(ibtp.index, 1);
        assert_eq!(ibtp.typ, IbtpType::Interchain);

        assert_eq!(consumer.poll_once(11, &tx).await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().index, 2);
    }

    #[tokio::test]
    async fn test_malformed_event_is_skipped() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        ledger.push_event(event(1, 3, "set,cb"));
        ledger.push_event(event(2, 4, "set,cb,rb"));
        let consumer = consumer(ledger, 1);
        let (tx, mut rx) = mpsc::channel(8);

        assert_eq!(consumer.poll_once(10, &tx).await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().index, 2);
        assert_eq!(consumer.cursor(), 9);
    }

    #[tokio::test]
    async fn test_closed_channel_keeps_cursor() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        ledger.push_event(event(1, 3, "set,cb,rb"));
        let consumer = consumer(ledger, 1);
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let err = consumer.poll_once(10, &tx).await.unwrap_err();
        assert!(matches!(err, ClientError::ChannelClosed("ibtp")));
        assert_eq!(consumer.cursor(), 0);
    }

    #[tokio::test]
    async fn test_young_chain_is_not_scanned() {
        let ledger = Arc::new(InMemoryLedger::with_height(1));
        let consumer = consumer(ledger, 5);
        let (tx, _rx) = mpsc::channel(8);
        assert_eq!(consumer.poll_once(1, &tx).await.unwrap(), 0);
        assert_eq!(consumer.cursor(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_delivers_and_stops() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        ledger.push_event(event(7, 2, "set,cb,rb"));
        let consumer = Arc::new(consumer(ledger, 1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = consumer.spawn(tx, shutdown_rx);

        let ibtp = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ibtp.index, 7);

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}

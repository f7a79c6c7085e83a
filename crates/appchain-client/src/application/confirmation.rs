//! # Confirmation Waiter
//!
//! Two-phase wait for a submitted transaction: first until the ledger is
//! `min_confirm` blocks past the height seen at submission, then until the
//! receipt is available.
//!
//! The waiter keeps no per-transaction state. Every call is keyed only by
//! the transaction hash, so concurrent waits for unrelated transactions do
//! not interfere.

use std::sync::Arc;
use std::time::Duration;

use appchain_telemetry::BridgeMetrics;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

use crate::algorithms::{retry, Backoff, RetryError, RetryPolicy};
use crate::application::fatal::FatalSignal;
use crate::config::ClientConfig;
use crate::domain::{
    invariant_confirmation_depth, ClientError, Hash, LedgerError, TransactionReceipt,
};
use crate::ports::outbound::LedgerRpc;

/// Waits for finality and fetches receipts.
pub struct ConfirmationWaiter {
    rpc: Arc<dyn LedgerRpc>,
    min_confirm: u64,
    poll_interval: Duration,
    best_block_policy: RetryPolicy,
    receipt_policy: RetryPolicy,
    fatal: FatalSignal,
    metrics: Arc<BridgeMetrics>,
}

impl ConfirmationWaiter {
    /// Build from client configuration.
    pub fn new(
        config: &ClientConfig,
        rpc: Arc<dyn LedgerRpc>,
        fatal: FatalSignal,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            rpc,
            min_confirm: config.ether.min_confirm,
            poll_interval: config.retry.confirm_poll_interval(),
            best_block_policy: config.retry.best_block_policy(),
            receipt_policy: config.retry.receipt_policy(),
            fatal,
            metrics,
        }
    }

    /// Best height, retried per the best-block policy.
    ///
    /// Exhaustion raises the fatal signal and returns
    /// [`ClientError::HeightOracleLost`].
    pub async fn best_block(&self) -> Result<u64, ClientError> {
        let rpc = &self.rpc;
        let result = retry(&self.best_block_policy, |attempt| async move {
            rpc.block_number().await.map_err(|e| {
                warn!(attempt, error = %e, "Best block query failed");
                Backoff::Transient(e)
            })
        })
        .await;

        result.map_err(|e: RetryError<LedgerError>| {
            let attempts = e.attempts();
            let last_error = e.into_inner().to_string();
            error!(attempts, error = %last_error, "Height oracle lost");
            let err = ClientError::HeightOracleLost {
                attempts,
                last_error,
            };
            self.fatal.raise(err.to_string());
            err
        })
    }

    /// Block until `tx_hash` is `min_confirm` blocks deep, then return its receipt.
    pub async fn wait_for_confirmed(
        &self,
        tx_hash: Hash,
    ) -> Result<TransactionReceipt, ClientError> {
        let started = Instant::now();
        let start = self.best_block().await?;

        loop {
            let current = self.best_block().await?;
            if invariant_confirmation_depth(start, current, self.min_confirm) {
                break;
            }
            debug!(
                tx_hash = %hex::encode(tx_hash),
                start,
                current,
                min_confirm = self.min_confirm,
                "Waiting for confirmations"
            );
            sleep(self.poll_interval).await;
        }

        let receipt = self.fetch_receipt(tx_hash).await?;
        self.metrics
            .observe_confirmation_wait(started.elapsed().as_secs_f64());
        appchain_telemetry::log_tx_event!(
            debug,
            "confirmation",
            "Transaction confirmed",
            hex::encode(tx_hash),
            block = receipt.block_number,
            success = receipt.is_success()
        );
        Ok(receipt)
    }

    async fn fetch_receipt(&self, tx_hash: Hash) -> Result<TransactionReceipt, ClientError> {
        let rpc = &self.rpc;
        retry(&self.receipt_policy, |attempt| async move {
            match rpc.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => Ok(receipt),
                Ok(None) => Err(Backoff::Transient(LedgerError::NotFound(format!(
                    "receipt for 0x{}",
                    hex::encode(tx_hash)
                )))),
                Err(e) => {
                    warn!(attempt, error = %e, "Receipt lookup failed");
                    Err(Backoff::Transient(e))
                }
            }
        })
        .await
        .map_err(|e| ClientError::Ledger(e.into_inner()))
    }
}

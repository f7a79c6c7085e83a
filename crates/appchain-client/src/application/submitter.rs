//! # Transaction Submitter
//!
//! Turns relay-hub messages and receipts into broker calls.
//!
//! ## Submission flow
//!
//! ```text
//! plan call ──► lock ──► transact (retry: transport errors) ──► unlock ──► wait for confirmation
//!                              │
//!                              └── revert: one attempt, failed outcome
//! ```
//!
//! At most one mutating call is in flight per client. The lock covers the
//! transact attempts only; confirmation waits run concurrently.

use std::future::Future;
use std::sync::Arc;

use appchain_telemetry::{BridgeMetrics, SubmitStatus};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapters::session::{methods, InterchainCallHead, LedgerSession, ReceiptCallHead};
use crate::algorithms::{
    join_groups, plan_interchain, retry, route_receipt, Backoff, InterchainCall, ReceiptRoute,
    RetryPolicy,
};
use crate::application::confirmation::ConfirmationWaiter;
use crate::domain::{
    ClientError, Hash, IbtpSubmission, LedgerError, ReceiptSubmission, SubmitOutcome,
    SUBMIT_IBTP_ERR, SUBMIT_RECEIPT_ERR,
};

/// Call context logged on every failed attempt.
struct FailureTrail<'a> {
    method: &'static str,
    src: &'a str,
    dst: &'a str,
    index: u64,
    req_type: u64,
    call_func: &'a str,
    args: Vec<Vec<u8>>,
    tx_status: u64,
    multi_sign: &'a [Vec<u8>],
}

impl FailureTrail<'_> {
    fn log(&self, attempt: u32, err: &LedgerError) {
        let joined = self.args.join(&b","[..]);
        appchain_telemetry::log_ibtp_event!(
            warn,
            "submitter",
            "Broker call failed",
            self.src,
            self.dst,
            self.index,
            method = self.method,
            attempt,
            req_type = self.req_type,
            call_func = self.call_func,
            args = %String::from_utf8_lossy(&joined),
            tx_status = self.tx_status,
            multi_sign_size = self.multi_sign.len(),
            error = %err
        );
        for (i, arg) in self.args.iter().enumerate() {
            warn!(method = self.method, i, arg = %format!("0x{}", hex::encode(arg)), "args");
        }
        for (i, sign) in self.multi_sign.iter().enumerate() {
            warn!(method = self.method, i, sign = %format!("0x{}", hex::encode(sign)), "multiSign");
        }
    }
}

/// Serializes broker mutations and reports their outcome.
pub struct TransactionSubmitter {
    session: Arc<dyn LedgerSession>,
    waiter: Arc<ConfirmationWaiter>,
    policy: RetryPolicy,
    lock: Mutex<()>,
    metrics: Arc<BridgeMetrics>,
}

impl TransactionSubmitter {
    /// Create a submitter.
    pub fn new(
        session: Arc<dyn LedgerSession>,
        waiter: Arc<ConfirmationWaiter>,
        policy: RetryPolicy,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            session,
            waiter,
            policy,
            lock: Mutex::new(()),
            metrics,
        }
    }

    /// Execute a relay-hub message.
    ///
    /// Malformed multi-transaction arguments are rejected before any ledger
    /// call. Ledger failures become a failed outcome.
    pub async fn submit_interchain(
        &self,
        sub: &IbtpSubmission,
    ) -> Result<SubmitOutcome, ClientError> {
        let plan = plan_interchain(&sub.content.args)?;
        let head = InterchainCallHead {
            src_full_id: sub.from.clone(),
            dest_addr: sub.service_id.clone(),
            index: sub.index,
            req_type: sub.typ.as_u64(),
            call_func: sub.content.func.clone(),
            tx_status: sub.proof.tx_status.as_u64(),
            multi_sign: sub.proof.multi_sign.clone(),
            encrypt: sub.is_encrypted,
        };

        let (method, trail_args) = match &plan {
            InterchainCall::Single(args) => (methods::INVOKE_INTERCHAIN, args.clone()),
            InterchainCall::Multi(groups) => (methods::INVOKE_MULTI_INTERCHAIN, join_groups(groups)),
        };
        let trail = FailureTrail {
            method,
            src: &head.src_full_id,
            dst: &head.dest_addr,
            index: head.index,
            req_type: head.req_type,
            call_func: &head.call_func,
            args: trail_args,
            tx_status: head.tx_status,
            multi_sign: &head.multi_sign,
        };

        let session = &self.session;
        let head_ref = &head;
        let submitted = match &plan {
            InterchainCall::Single(args) => {
                self.transact(&trail, || session.invoke_interchain(head_ref, args))
                    .await
            }
            InterchainCall::Multi(groups) => {
                self.transact(&trail, || session.invoke_multi_interchain(head_ref, groups))
                    .await
            }
        };

        let outcome = self.finish(method, submitted, SUBMIT_IBTP_ERR).await?;
        appchain_telemetry::log_ibtp_event!(
            info,
            "submitter",
            "SubmitIBTP finished",
            sub.from,
            sub.service_id,
            sub.index,
            status = outcome.status,
            message = %outcome.message
        );
        Ok(outcome)
    }

    /// Deliver destination results back to this chain.
    pub async fn submit_receipt(
        &self,
        sub: &ReceiptSubmission,
    ) -> Result<SubmitOutcome, ClientError> {
        let results = sub.result.results();
        let head = ReceiptCallHead {
            src_addr: sub.service_id.clone(),
            dst_full_id: sub.to.clone(),
            index: sub.index,
            req_type: sub.typ.as_u64(),
            tx_status: sub.proof.tx_status.as_u64(),
            multi_sign: sub.proof.multi_sign.clone(),
        };
        let route = route_receipt(&sub.result.multi_status, sub.proof.tx_status);
        let method = match route {
            ReceiptRoute::Single => methods::INVOKE_RECEIPT,
            ReceiptRoute::Multi => methods::INVOKE_MULTI_RECEIPT,
        };
        let trail = FailureTrail {
            method,
            src: &head.src_addr,
            dst: &head.dst_full_id,
            index: head.index,
            req_type: head.req_type,
            call_func: "",
            args: join_groups(&results),
            tx_status: head.tx_status,
            multi_sign: &head.multi_sign,
        };

        let session = &self.session;
        let head_ref = &head;
        let results_ref = &results;
        let statuses = &sub.result.multi_status;
        let submitted = match route {
            ReceiptRoute::Single => {
                self.transact(&trail, || session.invoke_receipt(head_ref, results_ref))
                    .await
            }
            ReceiptRoute::Multi => {
                self.transact(&trail, || {
                    session.invoke_multi_receipt(head_ref, results_ref, statuses)
                })
                .await
            }
        };

        self.finish(method, submitted, SUBMIT_RECEIPT_ERR).await
    }

    /// Execute several messages in one broker call.
    pub async fn submit_batch(
        &self,
        batch: &[IbtpSubmission],
    ) -> Result<SubmitOutcome, ClientError> {
        let mut heads = Vec::with_capacity(batch.len());
        let mut args = Vec::with_capacity(batch.len());
        for sub in batch {
            let Some((_, rest)) = sub.content.args.split_first() else {
                return Err(ClientError::Format(format!(
                    "batch entry {}#{} carries no type tag",
                    sub.from, sub.index
                )));
            };
            heads.push(InterchainCallHead {
                src_full_id: sub.from.clone(),
                dest_addr: sub.service_id.clone(),
                index: sub.index,
                req_type: sub.typ.as_u64(),
                call_func: sub.content.func.clone(),
                tx_status: sub.proof.tx_status.as_u64(),
                multi_sign: sub.proof.multi_sign.clone(),
                encrypt: sub.is_encrypted,
            });
            args.push(rest.to_vec());
        }

        let multi_sign: Vec<Vec<u8>> = heads
            .iter()
            .flat_map(|h| h.multi_sign.iter().cloned())
            .collect();
        let first = heads.first();
        let trail = FailureTrail {
            method: methods::INVOKE_INTERCHAINS,
            src: first.map(|h| h.src_full_id.as_str()).unwrap_or_default(),
            dst: first.map(|h| h.dest_addr.as_str()).unwrap_or_default(),
            index: first.map(|h| h.index).unwrap_or_default(),
            req_type: first.map(|h| h.req_type).unwrap_or_default(),
            call_func: first.map(|h| h.call_func.as_str()).unwrap_or_default(),
            args: join_groups(&args),
            tx_status: first.map(|h| h.tx_status).unwrap_or_default(),
            multi_sign: &multi_sign,
        };

        let session = &self.session;
        let heads_ref = &heads;
        let args_ref = &args;
        let submitted = self
            .transact(&trail, || session.invoke_interchains(heads_ref, args_ref))
            .await;

        self.finish(methods::INVOKE_INTERCHAINS, submitted, SUBMIT_IBTP_ERR)
            .await
    }

    /// Run `call` under the submission lock with retries.
    ///
    /// Only transient errors are retried; anything else ends the loop after
    /// the attempt that produced it.
    async fn transact<F, Fut>(
        &self,
        trail: &FailureTrail<'_>,
        call: F,
    ) -> Result<Hash, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Hash, LedgerError>>,
    {
        let _guard = self.lock.lock().await;
        retry(&self.policy, |attempt| {
            let fut = call();
            async move {
                fut.await.map_err(|e| {
                    trail.log(attempt, &e);
                    if e.is_transient() {
                        Backoff::Transient(e)
                    } else {
                        Backoff::Permanent(e)
                    }
                })
            }
        })
        .await
        .map_err(|e| e.into_inner())
    }

    /// Confirm an accepted transaction and build the outcome.
    async fn finish(
        &self,
        method: &'static str,
        submitted: Result<Hash, LedgerError>,
        failure_message: &str,
    ) -> Result<SubmitOutcome, ClientError> {
        let tx_hash = match submitted {
            Ok(hash) => hash,
            Err(e) => {
                if e.is_irrecoverable() {
                    self.metrics.record_revert();
                }
                self.metrics.record_submission(method, SubmitStatus::Rejected);
                warn!(method, error = %e, "Submission rejected");
                return Ok(SubmitOutcome::failure(e.to_string(), None));
            }
        };

        let receipt = self.waiter.wait_for_confirmed(tx_hash).await?;
        if receipt.is_success() {
            self.metrics.record_submission(method, SubmitStatus::Success);
            info!(method, tx_hash = %hex::encode(tx_hash), "Transaction succeeded");
            Ok(SubmitOutcome::success(tx_hash))
        } else {
            self.metrics.record_submission(method, SubmitStatus::Failed);
            warn!(method, tx_hash = %hex::encode(tx_hash), "Transaction execution failed");
            Ok(SubmitOutcome::failure(failure_message, Some(tx_hash)))
        }
    }
}

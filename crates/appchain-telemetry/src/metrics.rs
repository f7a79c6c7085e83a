//! Prometheus metrics for the bridge client.
//!
//! All metrics follow the naming convention: `appchain_<component>_<metric>_<unit>`.
//! Collectors live in a per-instance [`Registry`] so two clients in one
//! process never share counters.

use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

/// Outcome label for submission counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Receipt confirmed with success status.
    Success,
    /// Receipt confirmed with failed status.
    Failed,
    /// Submission rejected before a receipt existed.
    Rejected,
}

impl SubmitStatus {
    fn as_label(self) -> &'static str {
        match self {
            SubmitStatus::Success => "success",
            SubmitStatus::Failed => "failed",
            SubmitStatus::Rejected => "rejected",
        }
    }
}

/// Bridge metrics handle.
pub struct BridgeMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    reverts: IntCounter,
    headers_fetched: IntCounter,
    header_batches_posted: IntCounter,
    ibtps_emitted: IntCounter,
    offchain_requests: IntCounter,
    offchain_shards: IntCounter,
    confirmation_wait: Histogram,
}

impl BridgeMetrics {
    /// Create and register all collectors in a fresh registry.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "appchain_submitter_transactions_total",
                "Ledger transactions submitted, by method and outcome",
            ),
            &["method", "status"],
        )
        .map_err(metrics_err)?;
        let reverts = IntCounter::new(
            "appchain_submitter_reverts_total",
            "Submissions rejected with an execution revert",
        )
        .map_err(metrics_err)?;
        let headers_fetched = IntCounter::new(
            "appchain_header_pool_headers_fetched_total",
            "Finalized headers fetched from the ledger",
        )
        .map_err(metrics_err)?;
        let header_batches_posted = IntCounter::new(
            "appchain_header_pool_batches_posted_total",
            "Header batches posted to the relay hub",
        )
        .map_err(metrics_err)?;
        let ibtps_emitted = IntCounter::new(
            "appchain_events_ibtps_emitted_total",
            "Interchain messages converted from ledger events",
        )
        .map_err(metrics_err)?;
        let offchain_requests = IntCounter::new(
            "appchain_offchain_requests_total",
            "Off-chain data requests queued",
        )
        .map_err(metrics_err)?;
        let offchain_shards = IntCounter::new(
            "appchain_offchain_shards_reassembled_total",
            "Off-chain shards appended to reassembled files",
        )
        .map_err(metrics_err)?;
        let confirmation_wait = Histogram::with_opts(
            HistogramOpts::new(
                "appchain_confirmation_wait_seconds",
                "Time from submission to confirmed receipt",
            )
            .buckets(exponential_buckets(0.5, 2.0, 12).map_err(metrics_err)?),
        )
        .map_err(metrics_err)?;

        registry
            .register(Box::new(submissions.clone()))
            .map_err(metrics_err)?;
        registry.register(Box::new(reverts.clone())).map_err(metrics_err)?;
        registry
            .register(Box::new(headers_fetched.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(header_batches_posted.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(ibtps_emitted.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(offchain_requests.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(offchain_shards.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(confirmation_wait.clone()))
            .map_err(metrics_err)?;

        Ok(Self {
            registry,
            submissions,
            reverts,
            headers_fetched,
            header_batches_posted,
            ibtps_emitted,
            offchain_requests,
            offchain_shards,
            confirmation_wait,
        })
    }

    /// Record the outcome of one submission.
    pub fn record_submission(&self, method: &str, status: SubmitStatus) {
        self.submissions
            .with_label_values(&[method, status.as_label()])
            .inc();
    }

    /// Submissions recorded for a method/outcome pair.
    pub fn submissions(&self, method: &str, status: SubmitStatus) -> u64 {
        self.submissions
            .with_label_values(&[method, status.as_label()])
            .get()
    }

    /// Record an execution revert.
    pub fn record_revert(&self) {
        self.reverts.inc();
    }

    /// Reverts seen so far.
    pub fn reverts(&self) -> u64 {
        self.reverts.get()
    }

    /// Record one fetched header.
    pub fn record_header_fetched(&self) {
        self.headers_fetched.inc();
    }

    /// Headers fetched so far.
    pub fn headers_fetched(&self) -> u64 {
        self.headers_fetched.get()
    }

    /// Record one posted header batch.
    pub fn record_batch_posted(&self) {
        self.header_batches_posted.inc();
    }

    /// Batches posted so far.
    pub fn batches_posted(&self) -> u64 {
        self.header_batches_posted.get()
    }

    /// Record one converted interchain message.
    pub fn record_ibtp_emitted(&self) {
        self.ibtps_emitted.inc();
    }

    /// Interchain messages emitted so far.
    pub fn ibtps_emitted(&self) -> u64 {
        self.ibtps_emitted.get()
    }

    /// Record one queued off-chain request.
    pub fn record_offchain_request(&self) {
        self.offchain_requests.inc();
    }

    /// Off-chain requests queued so far.
    pub fn offchain_requests(&self) -> u64 {
        self.offchain_requests.get()
    }

    /// Record one reassembled shard.
    pub fn record_shard(&self) {
        self.offchain_shards.inc();
    }

    /// Shards reassembled so far.
    pub fn shards(&self) -> u64 {
        self.offchain_shards.get()
    }

    /// Observe a confirmation wait in seconds.
    pub fn observe_confirmation_wait(&self, seconds: f64) {
        self.confirmation_wait.observe(seconds);
    }

    /// Render all collectors in the Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
    }
}

fn metrics_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_counters_are_labelled() {
        let metrics = BridgeMetrics::new().unwrap();
        metrics.record_submission("invokeInterchain", SubmitStatus::Success);
        metrics.record_submission("invokeInterchain", SubmitStatus::Success);
        metrics.record_submission("invokeReceipt", SubmitStatus::Rejected);

        assert_eq!(metrics.submissions("invokeInterchain", SubmitStatus::Success), 2);
        assert_eq!(metrics.submissions("invokeReceipt", SubmitStatus::Rejected), 1);
        assert_eq!(metrics.submissions("invokeReceipt", SubmitStatus::Success), 0);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = BridgeMetrics::new().unwrap();
        let b = BridgeMetrics::new().unwrap();
        a.record_revert();
        assert_eq!(a.reverts(), 1);
        assert_eq!(b.reverts(), 0);
    }

    #[test]
    fn test_gather_text_contains_metric_names() {
        let metrics = BridgeMetrics::new().unwrap();
        metrics.record_batch_posted();
        metrics.observe_confirmation_wait(1.5);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("appchain_header_pool_batches_posted_total 1"));
        assert!(text.contains("appchain_confirmation_wait_seconds"));
    }
}

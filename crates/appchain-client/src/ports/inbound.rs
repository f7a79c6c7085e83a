//! # Inbound Ports
//!
//! API the host runtime drives: lifecycle, submissions, queries, off-chain
//! transfer and the outbound channel handles.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{
    AppchainInfo, ClientError, DirectTransactionMeta, Ibtp, IbtpSubmission, OffChainDataInfo,
    OffChainDataRequest, OffChainDataResponse, ReceiptSubmission, ServiceMeta, SubmitOutcome,
    UpdateMeta,
};

/// Appchain plugin API - inbound port.
#[async_trait]
pub trait AppchainApi: Send + Sync {
    /// Configured appchain name.
    fn name(&self) -> &str;

    /// Ledger family served by this client.
    fn chain_type(&self) -> &str;

    /// Spawn the background loops.
    async fn start(&self) -> Result<(), ClientError>;

    /// Signal shutdown and wait for the background loops.
    async fn stop(&self) -> Result<(), ClientError>;

    /// Execute a relay-hub message on the ledger.
    ///
    /// Ledger failures are reported in the outcome; only malformed input and
    /// off-chain setup failures are returned as errors.
    async fn submit_ibtp(&self, submission: IbtpSubmission) -> Result<SubmitOutcome, ClientError>;

    /// Return destination results for a message this chain sent.
    async fn submit_receipt(
        &self,
        submission: ReceiptSubmission,
    ) -> Result<SubmitOutcome, ClientError>;

    /// Execute several messages in one ledger call.
    async fn submit_ibtp_batch(
        &self,
        batch: Vec<IbtpSubmission>,
    ) -> Result<SubmitOutcome, ClientError>;

    /// Rebuild an outbound message from contract storage.
    async fn get_out_message(&self, service_pair: &str, index: u64) -> Result<Ibtp, ClientError>;

    /// Rebuild the receipt message for a service pair and index.
    async fn get_receipt_message(
        &self,
        service_pair: &str,
        index: u64,
    ) -> Result<Ibtp, ClientError>;

    /// Inbound message counters.
    async fn get_in_meta(&self) -> Result<ServiceMeta, ClientError>;

    /// Outbound message counters.
    async fn get_out_meta(&self) -> Result<ServiceMeta, ClientError>;

    /// Executed callback counters.
    async fn get_callback_meta(&self) -> Result<ServiceMeta, ClientError>;

    /// Destination rollback counters.
    async fn get_dst_rollback_meta(&self) -> Result<ServiceMeta, ClientError>;

    /// `(bxh_id, chain_id)`.
    async fn get_chain_id(&self) -> Result<(String, String), ClientError>;

    /// Locally registered services.
    async fn get_services(&self) -> Result<Vec<String>, ClientError>;

    /// Peer appchain registration (direct mode).
    async fn get_appchain_info(&self, chain_id: &str) -> Result<AppchainInfo, ClientError>;

    /// Transaction timing metadata (direct mode).
    async fn get_direct_transaction_meta(
        &self,
        ibtp_id: &str,
    ) -> Result<DirectTransactionMeta, ClientError>;

    /// Metadata of a local file a peer asked for.
    async fn get_off_chain_data(
        &self,
        request: &OffChainDataRequest,
    ) -> Result<OffChainDataInfo, ClientError>;

    /// Reassemble shards announced by a peer.
    async fn submit_off_chain_data(
        &self,
        response: &OffChainDataResponse,
    ) -> Result<(), ClientError>;

    /// Converted ledger events. Can be taken once.
    fn take_ibtp_receiver(&self) -> Result<mpsc::Receiver<Ibtp>, ClientError>;

    /// Header batch updates. Can be taken once.
    fn take_meta_receiver(&self) -> Result<mpsc::Receiver<UpdateMeta>, ClientError>;

    /// Off-chain fetch requests. Can be taken once.
    fn take_off_chain_request_receiver(
        &self,
    ) -> Result<mpsc::Receiver<OffChainDataRequest>, ClientError>;
}

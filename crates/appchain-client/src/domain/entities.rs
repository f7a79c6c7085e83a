//! # Domain Entities
//!
//! Interchain messages, ledger records and header batches.

use serde::{Deserialize, Serialize};

use super::errors::{ClientError, Hash};
use super::value_objects::{IbtpType, ReceiptStatus, TransactionStatus};

/// Outcome message when an interchain transaction is mined but failed.
pub const SUBMIT_IBTP_ERR: &str = "SubmitIBTP tx execution failed";

/// Outcome message when a receipt transaction is mined but failed.
pub const SUBMIT_RECEIPT_ERR: &str = "SubmitReceipt tx execution failed";

/// Proof placeholder attached to freshly converted messages.
pub const PLACEHOLDER_PROOF: &[u8] = b"1";

/// Canonical interchain message (IBTP).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ibtp {
    /// Source service identifier.
    pub from: String,
    /// Destination service identifier.
    pub to: String,
    /// Sequence index for the `(from, to)` pair.
    pub index: u64,
    /// Message type.
    pub typ: IbtpType,
    /// Creation time in nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Proof bytes.
    pub proof: Vec<u8>,
    /// Serialized [`Payload`].
    pub payload: Vec<u8>,
    /// Relative timeout, in relay-hub blocks. Zero means no timeout.
    pub timeout_height: u64,
}

impl Ibtp {
    /// Stamp the relative timeout.
    pub fn with_timeout_height(mut self, timeout_height: u64) -> Self {
        self.timeout_height = timeout_height;
        self
    }

    /// Decode the payload envelope.
    pub fn decode_payload(&self) -> Result<Payload, ClientError> {
        Ok(bincode::deserialize(&self.payload)?)
    }

    /// Decode the call content carried in the payload.
    pub fn content(&self) -> Result<Content, ClientError> {
        let payload = self.decode_payload()?;
        Ok(bincode::deserialize(&payload.content)?)
    }
}

/// Cross-chain call content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Source contract identifier.
    pub src_contract_id: String,
    /// Destination contract identifier.
    pub dst_contract_id: String,
    /// Function invoked on the destination.
    pub func: String,
    /// Positional arguments. The first one is the type tag.
    pub args: Vec<Vec<u8>>,
    /// Callback function on the source.
    pub callback: String,
    /// Callback arguments.
    pub args_cb: Vec<Vec<u8>>,
    /// Rollback function on the source.
    pub rollback: String,
    /// Rollback arguments.
    pub args_rb: Vec<Vec<u8>>,
}

/// Payload envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Whether `content` is encrypted.
    pub encrypted: bool,
    /// Serialized content or result.
    pub content: Vec<u8>,
}

impl Payload {
    /// Wrap serializable content into a serialized envelope.
    pub fn seal<T: Serialize>(encrypted: bool, content: &T) -> Result<Vec<u8>, ClientError> {
        let payload = Payload {
            encrypted,
            content: bincode::serialize(content)?,
        };
        Ok(bincode::serialize(&payload)?)
    }
}

/// Result data of one sub-transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultData {
    /// Returned values.
    pub data: Vec<Vec<u8>>,
}

/// Execution results carried by a receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbtpResult {
    /// One entry per sub-transaction.
    pub data: Vec<ResultData>,
    /// Per sub-transaction success flags.
    pub multi_status: Vec<bool>,
}

impl IbtpResult {
    /// Results as nested byte lists.
    pub fn results(&self) -> Vec<Vec<Vec<u8>>> {
        self.data.iter().map(|r| r.data.clone()).collect()
    }

    /// First value of the first result, if any.
    pub fn first_value(&self) -> Option<&[u8]> {
        self.data
            .first()
            .and_then(|r| r.data.first())
            .map(Vec::as_slice)
    }
}

/// Relay-hub proof attached to a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BxhProof {
    /// Cross-chain transaction status.
    pub tx_status: TransactionStatus,
    /// Multi-signature shares.
    pub multi_sign: Vec<Vec<u8>>,
}

/// Interchain event emitted by the broker contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchainEvent {
    /// Sequence index.
    pub index: u64,
    /// Full source service identifier.
    pub src_full_id: String,
    /// Full destination service identifier.
    pub dst_full_id: String,
    /// Source contract.
    pub src_contract: String,
    /// Destination contract.
    pub dst_contract: String,
    /// Comma-joined `call,callback,rollback`.
    pub funcs: String,
    /// Comma-joined arguments.
    pub args: String,
    /// Whether the payload is encrypted.
    pub encrypt: bool,
    /// Block that emitted the event.
    pub block_number: u64,
}

/// Stored receipt result for a service pair and index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiptMessage {
    /// Result values per sub-transaction.
    pub data: Vec<Vec<Vec<u8>>>,
    /// Stored IBTP type code.
    pub typ: u64,
    /// Whether results are encrypted.
    pub encrypt: bool,
    /// Per sub-transaction success flags.
    pub multi_status: Vec<bool>,
}

/// Final ledger receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Inclusion height.
    pub block_number: u64,
    /// Execution status.
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    /// Whether execution succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Ledger block header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height.
    pub number: u64,
    /// Block hash.
    pub hash: Hash,
    /// Parent hash.
    pub parent_hash: Hash,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

/// Result of a submission as reported to the relay hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Whether the transaction was confirmed successful.
    pub status: bool,
    /// Failure message; empty on success.
    pub message: String,
    /// Hash of the submitted transaction, when one was accepted.
    pub tx_hash: Option<Hash>,
}

impl SubmitOutcome {
    /// Successful outcome.
    pub fn success(tx_hash: Hash) -> Self {
        Self {
            status: true,
            message: String::new(),
            tx_hash: Some(tx_hash),
        }
    }

    /// Failed outcome.
    pub fn failure(message: impl Into<String>, tx_hash: Option<Hash>) -> Self {
        Self {
            status: false,
            message: message.into(),
            tx_hash,
        }
    }
}

/// Interchain message submitted by the relay hub for execution here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IbtpSubmission {
    /// Full source service identifier.
    pub from: String,
    /// Sequence index.
    pub index: u64,
    /// Local destination service (contract address).
    pub service_id: String,
    /// Message type.
    pub typ: IbtpType,
    /// Call content; `args[0]` is the type tag.
    pub content: Content,
    /// Relay-hub proof.
    pub proof: BxhProof,
    /// Whether the content is encrypted.
    pub is_encrypted: bool,
}

/// Execution result returned to this chain for a message it sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptSubmission {
    /// Full destination service identifier of the original message.
    pub to: String,
    /// Sequence index.
    pub index: u64,
    /// Local source service (contract address).
    pub service_id: String,
    /// Receipt type.
    pub typ: IbtpType,
    /// Destination results.
    pub result: IbtpResult,
    /// Relay-hub proof.
    pub proof: BxhProof,
}

/// Registration data of a peer appchain (direct mode).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppchainInfo {
    /// Broker contract address.
    pub broker: String,
    /// Trust root bytes.
    pub trust_root: Vec<u8>,
    /// Validation rule contract address.
    pub rule_address: String,
}

/// Timing metadata of a direct-mode transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectTransactionMeta {
    /// Start timestamp recorded by the contract.
    pub timestamp: u64,
    /// Configured timeout period.
    pub timeout_period: u64,
    /// Stored transaction status code.
    pub tx_status: u64,
}

/// Ordered run of consecutive headers awaiting flush.
#[derive(Clone, Debug, Default)]
pub struct HeaderBatch {
    headers: Vec<BlockHeader>,
}

impl HeaderBatch {
    /// Empty batch with room for `capacity` headers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            headers: Vec::with_capacity(capacity),
        }
    }

    /// Append a header. It must directly follow the last one.
    pub fn push(&mut self, header: BlockHeader) -> Result<(), ClientError> {
        if let Some(last) = self.headers.last() {
            let expected = last.number + 1;
            if header.number != expected {
                return Err(ClientError::NonContiguousHeader {
                    expected,
                    got: header.number,
                });
            }
        }
        self.headers.push(header);
        Ok(())
    }

    /// Number of buffered headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Buffered headers.
    pub fn headers(&self) -> &[BlockHeader] {
        &self.headers
    }

    /// Serialize the batch and reset it. Returns `None` when empty.
    pub fn flush(&mut self) -> Result<Option<UpdateMeta>, ClientError> {
        if self.headers.is_empty() {
            return Ok(None);
        }
        let meta = serde_json::to_vec(&self.headers)?;
        let capacity = self.headers.capacity();
        self.headers = Vec::with_capacity(capacity);
        Ok(Some(UpdateMeta { meta }))
    }
}

/// Header batch update sent to the relay hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateMeta {
    /// JSON-serialized header list.
    pub meta: Vec<u8>,
}

impl UpdateMeta {
    /// Decode the carried headers.
    pub fn headers(&self) -> Result<Vec<BlockHeader>, ClientError> {
        Ok(serde_json::from_slice(&self.meta)?)
    }
}

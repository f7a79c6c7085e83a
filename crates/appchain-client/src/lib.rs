//! # Appchain Bridge Client
//!
//! Relays interchain transactions between a smart-contract ledger and a
//! cross-chain relay hub.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Execute relay-hub messages (IBTPs) and receipts as broker-contract
//!   transactions, waiting for confirmation depth before trusting a receipt
//! - Convert broker events into IBTPs for the relay hub
//! - Stream finalized block headers to the relay hub in contiguous batches
//! - Move large payloads through the sharded off-chain transfer
//!
//! ## Failure Handling
//!
//! | Failure | Handling |
//! |---------|----------|
//! | RPC transport error | Retried with a fixed wait |
//! | Contract revert | Single attempt, failed outcome |
//! | Malformed message | Immediate error, no ledger call |
//! | File I/O error | Propagated, partial file left |
//! | Height oracle lost | Fatal signal, process exit |
//!
//! ## Module Structure
//!
//! ```text
//! appchain-client/
//! ├── domain/          # Ibtp, Content, HeaderBatch, ShardKey, errors
//! ├── algorithms/      # Retry loop, call planning, conversion, off-chain checks
//! ├── ports/           # AppchainApi (inbound), LedgerContract + LedgerRpc (outbound)
//! ├── adapters/        # Relayed/Direct sessions, websocket ledger, in-memory ledger
//! ├── application/     # AppchainClient and its background services
//! └── config.rs        # ClientConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    load_signer, open_session, DirectSession, EthereumLedger, InMemoryLedger, LedgerSession,
    RelayedSession,
};
pub use algorithms::{
    convert_event_to_ibtp, generate_receipt, plan_interchain, retry, route_receipt, Backoff,
    InterchainCall, ReceiptRoute, RetryError, RetryPolicy,
};
pub use application::{
    AppchainClient, ConfirmationWaiter, EventConsumer, FatalSignal, HeaderPool, OffChainStore,
    TransactionSubmitter,
};
pub use config::{
    ClientConfig, EtherConfig, EventConsumerConfig, HeaderSyncConfig, LedgerBackend, RetryConfig,
    CHAIN_TYPE,
};
pub use domain::{
    AppchainInfo, BlockHeader, BxhProof, ClientError, Content, DataOutcome,
    DirectTransactionMeta, Hash, HeaderBatch, Ibtp, IbtpResult, IbtpSubmission, IbtpType,
    InterchainEvent, LedgerError, OffChainDataInfo, OffChainDataRequest, OffChainDataResponse,
    Payload, ReceiptMessage, ReceiptStatus, ReceiptSubmission, ResultData, ServiceMeta,
    ServicePair, SessionMode, ShardKey, ShardTag, SubmitOutcome, TransactionReceipt,
    TransactionStatus, UpdateMeta,
};
pub use ports::{AbiValue, AppchainApi, LedgerContract, LedgerRpc};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

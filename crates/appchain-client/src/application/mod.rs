//! # Application Module
//!
//! Services wiring the domain logic to the ledger ports.

pub mod client;
pub mod confirmation;
pub mod event_consumer;
pub mod fatal;
pub mod header_pool;
pub mod offchain;
pub mod submitter;

pub use client::{
    AppchainClient, IBTP_CHANNEL_CAPACITY, META_CHANNEL_CAPACITY, OFF_CHAIN_REQUEST_CAPACITY,
};
pub use confirmation::ConfirmationWaiter;
pub use event_consumer::EventConsumer;
pub use fatal::FatalSignal;
pub use header_pool::{HeaderPool, HEADER_POOL_CAPACITY};
pub use offchain::OffChainStore;
pub use submitter::TransactionSubmitter;

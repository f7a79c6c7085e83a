//! Adapters Module
//!
//! Session variants over the broker contract, the websocket ledger adapter
//! and the simulated ledger.

pub mod ethereum;
pub mod in_memory_ledger;
pub mod session;

pub use ethereum::{load_signer, BrokerAbi, EthereumLedger};
pub use in_memory_ledger::{InMemoryLedger, ReceiptLookup, RecordedTransaction};
pub use session::{
    methods, open_session, DirectSession, InterchainCallHead, LedgerSession, ReceiptCallHead,
    RelayedSession,
};

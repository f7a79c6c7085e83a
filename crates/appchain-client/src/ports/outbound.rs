//! # Outbound Ports
//!
//! Traits for the ledger: the broker contract and the node RPC.
//!
//! ABI encoding, signing and deployment live behind [`LedgerContract`];
//! this crate only names methods and passes typed values.

use async_trait::async_trait;

use crate::domain::{
    Address, BlockHeader, Hash, InterchainEvent, LedgerError, TransactionReceipt,
};

/// Typed contract argument or return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    /// `bool`
    Bool(bool),
    /// `uint64`
    Uint(u64),
    /// `string`
    Str(String),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `address`
    Address(Address),
    /// Dynamic array.
    Array(Vec<AbiValue>),
}

impl AbiValue {
    /// Array of byte strings.
    pub fn bytes_list(items: &[Vec<u8>]) -> Self {
        AbiValue::Array(items.iter().cloned().map(AbiValue::Bytes).collect())
    }

    /// Array of arrays of byte strings.
    pub fn bytes_groups(groups: &[Vec<Vec<u8>>]) -> Self {
        AbiValue::Array(groups.iter().map(|g| Self::bytes_list(g)).collect())
    }

    /// Unwrap a `string`.
    pub fn into_string(self) -> Result<String, LedgerError> {
        match self {
            AbiValue::Str(s) => Ok(s),
            other => Err(decode_err("string", &other)),
        }
    }

    /// Unwrap a `uint64`.
    pub fn into_u64(self) -> Result<u64, LedgerError> {
        match self {
            AbiValue::Uint(v) => Ok(v),
            other => Err(decode_err("uint", &other)),
        }
    }

    /// Unwrap a `bool`.
    pub fn into_bool(self) -> Result<bool, LedgerError> {
        match self {
            AbiValue::Bool(v) => Ok(v),
            other => Err(decode_err("bool", &other)),
        }
    }

    /// Unwrap `bytes`.
    pub fn into_bytes(self) -> Result<Vec<u8>, LedgerError> {
        match self {
            AbiValue::Bytes(v) => Ok(v),
            other => Err(decode_err("bytes", &other)),
        }
    }

    /// Unwrap an `address` as 0x-prefixed hex.
    pub fn into_address_hex(self) -> Result<String, LedgerError> {
        match self {
            AbiValue::Address(a) => Ok(format!("0x{}", hex::encode(a))),
            other => Err(decode_err("address", &other)),
        }
    }

    /// Unwrap an array and convert each element.
    pub fn into_list<T>(
        self,
        f: impl Fn(AbiValue) -> Result<T, LedgerError>,
    ) -> Result<Vec<T>, LedgerError> {
        match self {
            AbiValue::Array(items) => items.into_iter().map(f).collect(),
            other => Err(decode_err("array", &other)),
        }
    }
}

fn decode_err(expected: &str, got: &AbiValue) -> LedgerError {
    LedgerError::Decode(format!("expected {expected}, got {got:?}"))
}

/// Broker contract - outbound port.
#[async_trait]
pub trait LedgerContract: Send + Sync {
    /// Send a state-changing call. Returns the transaction hash.
    async fn transact(&self, method: &str, args: Vec<AbiValue>) -> Result<Hash, LedgerError>;

    /// Run a read-only call.
    async fn call(&self, method: &str, args: Vec<AbiValue>) -> Result<Vec<AbiValue>, LedgerError>;
}

/// Ledger node RPC - outbound port.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Current best height.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Header at `number`.
    async fn header_by_number(&self, number: u64) -> Result<BlockHeader, LedgerError>;

    /// Receipt of a transaction; `None` until it is mined.
    async fn transaction_receipt(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<TransactionReceipt>, LedgerError>;

    /// Broker interchain events in `from_block..=to_block`.
    async fn interchain_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<InterchainEvent>, LedgerError>;
}

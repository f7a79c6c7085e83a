//! # Domain Value Objects
//!
//! Immutable value types for the appchain bridge.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ClientError;

/// Mapping from service identifier to last processed sequence index.
pub type ServiceMeta = HashMap<String, u64>;

/// Interchain message type tag.
///
/// The discriminants are the values carried on the wire and in the leading
/// argument of a message's content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IbtpType {
    /// Normal cross-chain call.
    #[default]
    Interchain,
    /// Destination executed successfully.
    ReceiptSuccess,
    /// Destination execution failed.
    ReceiptFailure,
    /// Source must roll back.
    ReceiptRollback,
    /// Rollback finished.
    ReceiptRollbackEnd,
    /// Rollback-bearing message.
    Rollback,
    /// Message carrying several sub-transactions.
    Multi,
}

impl IbtpType {
    /// Wire value.
    pub fn as_u64(self) -> u64 {
        match self {
            IbtpType::Interchain => 0,
            IbtpType::ReceiptSuccess => 1,
            IbtpType::ReceiptFailure => 2,
            IbtpType::ReceiptRollback => 3,
            IbtpType::ReceiptRollbackEnd => 4,
            IbtpType::Rollback => 5,
            IbtpType::Multi => 6,
        }
    }
}

impl TryFrom<u64> for IbtpType {
    type Error = ClientError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => IbtpType::Interchain,
            1 => IbtpType::ReceiptSuccess,
            2 => IbtpType::ReceiptFailure,
            3 => IbtpType::ReceiptRollback,
            4 => IbtpType::ReceiptRollbackEnd,
            5 => IbtpType::Rollback,
            6 => IbtpType::Multi,
            other => return Err(ClientError::Format(format!("unknown IBTP type {other}"))),
        })
    }
}

/// Cross-chain transaction status carried in a proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Transaction started, no result yet.
    #[default]
    Begin,
    /// Destination succeeded.
    Success,
    /// Destination failed.
    Failure,
    /// Source rolled back.
    Rollback,
}

impl TransactionStatus {
    /// Wire value.
    pub fn as_u64(self) -> u64 {
        match self {
            TransactionStatus::Begin => 0,
            TransactionStatus::Success => 1,
            TransactionStatus::Failure => 2,
            TransactionStatus::Rollback => 3,
        }
    }
}

impl TryFrom<u64> for TransactionStatus {
    type Error = ClientError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => TransactionStatus::Begin,
            1 => TransactionStatus::Success,
            2 => TransactionStatus::Failure,
            3 => TransactionStatus::Rollback,
            other => {
                return Err(ClientError::Format(format!(
                    "unknown transaction status {other}"
                )))
            }
        })
    }
}

/// Ledger receipt status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    /// Transaction executed.
    Success,
    /// Transaction was included but failed.
    Failed,
}

/// Operating mode of the ledger session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Messages pass through the relay broker contract.
    #[default]
    Relay,
    /// Appchains talk through the direct broker contract.
    Direct,
}

impl SessionMode {
    /// Lowercase mode name.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Relay => "relay",
            SessionMode::Direct => "direct",
        }
    }
}

/// Ordered `(source, destination)` service pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServicePair {
    /// Source service identifier.
    pub from: String,
    /// Destination service identifier.
    pub to: String,
}

impl ServicePair {
    /// Create a pair.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl FromStr for ServicePair {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [from, to] if !from.is_empty() && !to.is_empty() => Ok(Self::new(*from, *to)),
            _ => Err(ClientError::InvalidServicePair(s.to_string())),
        }
    }
}

impl fmt::Display for ServicePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Outcome tag of an off-chain data response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOutcome {
    /// Peer produced the shards.
    Success,
    /// Peer could not produce the data.
    Failure,
}

impl fmt::Display for DataOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOutcome::Success => f.write_str("success"),
            DataOutcome::Failure => f.write_str("failure"),
        }
    }
}

/// Position of a shard within an off-chain transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTag {
    /// 1-based shard number.
    pub shard_index: u64,
    /// Total number of shards.
    pub shard_size: u64,
}

/// Identity of one shard file.
///
/// Renders as `from-to-index-shard-size`. Identifier components are
/// percent-escaped so a `-`, `%` or path separator inside an identifier
/// cannot collide with another key or escape the shard directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShardKey {
    /// Source identifier.
    pub from: String,
    /// Destination identifier.
    pub to: String,
    /// Transfer index.
    pub index: u64,
    /// 1-based shard number.
    pub shard: u64,
    /// Total shards.
    pub shard_size: u64,
}

impl ShardKey {
    /// File name of the shard.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            escape_component(&self.from),
            escape_component(&self.to),
            self.index,
            self.shard,
            self.shard_size
        )
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '-' => out.push_str("%2D"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ibtp_type_wire_values() {
        for v in 0..=6u64 {
            assert_eq!(IbtpType::try_from(v).unwrap().as_u64(), v);
        }
        assert!(IbtpType::try_from(7).is_err());
        assert_eq!(IbtpType::Multi.as_u64(), 6);
    }

    #[test]
    fn test_service_pair_parse() {
        let pair: ServicePair = "1356:chain0:0xabc-1356:chain1:0xdef".parse().unwrap();
        assert_eq!(pair.from, "1356:chain0:0xabc");
        assert_eq!(pair.to, "1356:chain1:0xdef");
        assert_eq!(pair.to_string(), "1356:chain0:0xabc-1356:chain1:0xdef");
    }

    #[test]
    fn test_service_pair_rejects_malformed() {
        assert!("no-separator-here".parse::<ServicePair>().is_err());
        assert!("single".parse::<ServicePair>().is_err());
        assert!("-to".parse::<ServicePair>().is_err());
        assert!("from-".parse::<ServicePair>().is_err());
    }

    #[test]
    fn test_shard_key_plain_identifiers() {
        let key = ShardKey {
            from: "1356:chain0:svc".into(),
            to: "1356:chain1:svc".into(),
            index: 4,
            shard: 2,
            shard_size: 3,
        };
        assert_eq!(key.file_name(), "1356:chain0:svc-1356:chain1:svc-4-2-3");
    }

    #[test]
    fn test_shard_key_escapes_delimiters() {
        let a = ShardKey {
            from: "a-b".into(),
            to: "c".into(),
            index: 1,
            shard: 1,
            shard_size: 1,
        };
        let b = ShardKey {
            from: "a".into(),
            to: "b-c".into(),
            index: 1,
            shard: 1,
            shard_size: 1,
        };
        assert_ne!(a.file_name(), b.file_name());

        let traversal = ShardKey {
            from: "../etc".into(),
            to: "x".into(),
            index: 1,
            shard: 1,
            shard_size: 1,
        };
        assert!(!traversal.file_name().contains('/'));
    }

    #[test]
    fn test_data_outcome_display() {
        assert_eq!(DataOutcome::Failure.to_string(), "failure");
        assert_eq!(DataOutcome::Success.to_string(), "success");
    }
}

//! # Domain Errors
//!
//! Error types for the appchain bridge client.
//!
//! Ledger failures are split into transport errors, which the retry layer
//! absorbs, and reverts, which are surfaced to the relay hub as a failed
//! outcome after a single attempt.

use std::path::PathBuf;

use thiserror::Error;

/// Hash type (32-byte ledger transaction or block hash).
pub type Hash = [u8; 32];

/// Address type (20-byte ledger account or contract address).
pub type Address = [u8; 20];

/// Error text the ledger reports when the contract rejected a call.
pub const EXECUTION_REVERTED: &str = "execution reverted";

/// Errors raised by the ledger ports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// RPC or network failure. Safe to retry.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The contract rejected the call.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// Requested object does not exist (yet).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is not available in the active session mode.
    #[error("Unsupported in {mode} mode: {operation}")]
    Unsupported {
        /// Session mode name
        mode: &'static str,
        /// Operation name
        operation: &'static str,
    },

    /// Contract returned values of an unexpected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Whether retrying the same call can never succeed.
    pub fn is_irrecoverable(&self) -> bool {
        match self {
            LedgerError::Reverted(_) => true,
            LedgerError::Transport(msg) => msg.contains(EXECUTION_REVERTED),
            _ => false,
        }
    }

    /// Whether the same call may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Transport(_) => !self.is_irrecoverable(),
            LedgerError::NotFound(_) => true,
            _ => false,
        }
    }
}

/// Client-level errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Ledger failure that was not absorbed by retry.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Malformed interchain message or event.
    #[error("Format error: {0}")]
    Format(String),

    /// Service pair key is not `<from>-<to>`.
    #[error("Invalid service pair: {0}")]
    InvalidServicePair(String),

    /// Local file access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Peer reported a failed off-chain transfer.
    #[error("{outcome}:{message}")]
    OffChainDataFailure {
        /// Outcome tag
        outcome: String,
        /// Peer message
        message: String,
    },

    /// Best-height queries exhausted their retries.
    #[error("Height oracle lost after {attempts} attempts: {last_error}")]
    HeightOracleLost {
        /// Attempts made
        attempts: u32,
        /// Last observed error
        last_error: String,
    },

    /// A channel endpoint was dropped.
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// Background loops are already running.
    #[error("Already started")]
    AlreadyStarted,

    /// Single-consumer channel receiver was already handed out.
    #[error("Receiver already taken: {0}")]
    ReceiverTaken(&'static str),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing key could not be loaded.
    #[error("Signer error: {0}")]
    Signer(String),

    /// Encoding or decoding of a message failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Header does not extend the pending batch.
    #[error("Non-contiguous header: expected {expected}, got {got}")]
    NonContiguousHeader {
        /// Expected height
        expected: u64,
        /// Offered height
        got: u64,
    },
}

impl ClientError {
    /// Whether the error must take the process down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::HeightOracleLost { .. })
    }
}

impl From<bincode::Error> for ClientError {
    fn from(e: bincode::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_is_irrecoverable() {
        assert!(LedgerError::Reverted("nonce".into()).is_irrecoverable());
        assert!(
            LedgerError::Transport("rpc: execution reverted: index".into()).is_irrecoverable()
        );
        assert!(!LedgerError::Transport("connection refused".into()).is_irrecoverable());
        assert!(!LedgerError::NotFound("receipt".into()).is_irrecoverable());
    }

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Transport("connection refused".into()).is_transient());
        assert!(!LedgerError::Transport("execution reverted".into()).is_transient());
        assert!(!LedgerError::Decode("shape".into()).is_transient());
        assert!(!LedgerError::Unsupported {
            mode: "direct",
            operation: "invoke_interchains"
        }
        .is_transient());
    }

    #[test]
    fn test_offchain_failure_display() {
        let err = ClientError::OffChainDataFailure {
            outcome: "failure".into(),
            message: "disk full".into(),
        };
        assert_eq!(err.to_string(), "failure:disk full");
    }

    #[test]
    fn test_height_oracle_lost_is_fatal() {
        let err = ClientError::HeightOracleLost {
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("3 attempts"));
        assert!(!ClientError::Format("x".into()).is_fatal());
    }

    #[test]
    fn test_unsupported_display() {
        let err = LedgerError::Unsupported {
            mode: "relay",
            operation: "get_appchain_info",
        };
        assert!(err.to_string().contains("relay"));
        assert!(err.to_string().contains("get_appchain_info"));
    }
}

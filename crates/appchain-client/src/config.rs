//! # Client Configuration
//!
//! Configuration for the appchain bridge client. Loaded from TOML by the
//! runtime; every field has a default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::RetryPolicy;
use crate::domain::{ClientError, SessionMode};

/// Default confirmation depth of the header pool.
pub const DEFAULT_FINALITY_THRESHOLD: u64 = 10;

/// Ledger type reported to the host runtime.
pub const CHAIN_TYPE: &str = "ethereum";

/// Ledger implementation behind the client ports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// Websocket JSON-RPC node at `ether.addr`.
    #[default]
    Rpc,
    /// Simulated in-process ledger for development and tests.
    Memory,
}

/// Top-level client configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ledger connection and bridge options.
    pub ether: EtherConfig,
    /// Header synchronization timing.
    pub header_sync: HeaderSyncConfig,
    /// Event consumer timing.
    pub event_consumer: EventConsumerConfig,
    /// Retry and confirmation timing.
    pub retry: RetryConfig,
}

/// Ledger connection and bridge options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EtherConfig {
    /// Appchain name.
    pub name: String,
    /// Ledger websocket RPC address.
    pub addr: String,
    /// Broker contract address.
    pub contract_address: String,
    /// Signing key file, relative to the config directory.
    pub key_path: String,
    /// Password file, relative to the config directory.
    pub password: String,
    /// Blocks required past submission before a receipt is trusted.
    pub min_confirm: u64,
    /// Timeout height reported with outbound messages.
    pub timeout_height: u64,
    /// Timeout period reported with direct transaction metadata.
    pub timeout_period: u64,
    /// Service address that marks off-chain transfers.
    pub off_chain_addr: String,
    /// Directory for reassembled off-chain files.
    pub off_chain_path: PathBuf,
    /// Session mode.
    pub mode: SessionMode,
    /// Ledger implementation.
    pub backend: LedgerBackend,
}

impl Default for EtherConfig {
    fn default() -> Self {
        Self {
            name: "ether".to_string(),
            addr: "ws://127.0.0.1:8546".to_string(),
            contract_address: String::new(),
            key_path: "account.key".to_string(),
            password: "password".to_string(),
            min_confirm: 1,
            timeout_height: 50,
            timeout_period: 60,
            off_chain_addr: String::new(),
            off_chain_path: PathBuf::from("offchain"),
            mode: SessionMode::Relay,
            backend: LedgerBackend::Rpc,
        }
    }
}

/// Header synchronization timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSyncConfig {
    /// Run the header pool.
    pub enabled: bool,
    /// Height already synchronized; fetching starts above it.
    pub start_height: u64,
    /// Listener tick in milliseconds.
    pub poll_interval_ms: u64,
    /// Poster tick in milliseconds.
    pub post_interval_ms: u64,
    /// Blocks kept back from the tip.
    pub finality_threshold: u64,
}

impl Default for HeaderSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_height: 0,
            poll_interval_ms: 2_000,
            post_interval_ms: 10_000,
            finality_threshold: DEFAULT_FINALITY_THRESHOLD,
        }
    }
}

impl HeaderSyncConfig {
    /// Listener tick.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poster tick.
    pub fn post_interval(&self) -> Duration {
        Duration::from_millis(self.post_interval_ms)
    }
}

/// Event consumer timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConsumerConfig {
    /// Run the event consumer.
    pub enabled: bool,
    /// Height already scanned; scanning starts above it.
    pub start_height: u64,
    /// Poll tick in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for EventConsumerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_height: 0,
            poll_interval_ms: 2_000,
        }
    }
}

impl EventConsumerConfig {
    /// Poll tick.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Retry and confirmation timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Wait between submission attempts.
    pub submit_wait_ms: u64,
    /// Wait between receipt lookups.
    pub receipt_wait_ms: u64,
    /// Wait between best-height queries.
    pub best_block_wait_ms: u64,
    /// Best-height attempts before the client gives up.
    pub best_block_max_attempts: u32,
    /// Height poll interval while waiting for confirmations.
    pub confirm_poll_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            submit_wait_ms: 2_000,
            receipt_wait_ms: 2_000,
            best_block_wait_ms: 10_000,
            best_block_max_attempts: crate::algorithms::retry::BEST_BLOCK_MAX_ATTEMPTS,
            confirm_poll_interval_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Submission policy.
    pub fn submission_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.submit_wait_ms))
    }

    /// Receipt lookup policy.
    pub fn receipt_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.receipt_wait_ms))
    }

    /// Best-height policy.
    pub fn best_block_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.best_block_wait_ms))
            .with_max_attempts(self.best_block_max_attempts)
    }

    /// Confirmation poll interval.
    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}

impl ClientConfig {
    /// Create a config for testing (millisecond timings).
    pub fn for_testing() -> Self {
        Self {
            ether: EtherConfig {
                name: "ether-test".to_string(),
                contract_address: "0x0000000000000000000000000000000000000001".to_string(),
                min_confirm: 2,
                backend: LedgerBackend::Memory,
                ..Default::default()
            },
            header_sync: HeaderSyncConfig {
                poll_interval_ms: 20,
                post_interval_ms: 50,
                finality_threshold: 2,
                ..Default::default()
            },
            event_consumer: EventConsumerConfig {
                poll_interval_ms: 20,
                ..Default::default()
            },
            retry: RetryConfig {
                submit_wait_ms: 5,
                receipt_wait_ms: 5,
                best_block_wait_ms: 5,
                best_block_max_attempts: 3,
                confirm_poll_interval_ms: 5,
            },
        }
    }

    /// Check option consistency.
    pub fn validate(&self) -> Result<(), ClientError> {
        let ether = &self.ether;
        if ether.name.trim().is_empty() {
            return Err(ClientError::Config("ether.name must not be empty".into()));
        }
        if ether.addr.trim().is_empty() {
            return Err(ClientError::Config("ether.addr must not be empty".into()));
        }
        if ether.contract_address.trim().is_empty() {
            return Err(ClientError::Config(
                "ether.contract_address must not be empty".into(),
            ));
        }
        if ether.backend == LedgerBackend::Rpc
            && !(ether.addr.starts_with("ws://") || ether.addr.starts_with("wss://"))
        {
            return Err(ClientError::Config(format!(
                "ether.addr must be a ws:// or wss:// url, got {}",
                ether.addr
            )));
        }

        let intervals = [
            ("header_sync.poll_interval_ms", self.header_sync.poll_interval_ms),
            ("header_sync.post_interval_ms", self.header_sync.post_interval_ms),
            ("event_consumer.poll_interval_ms", self.event_consumer.poll_interval_ms),
            ("retry.confirm_poll_interval_ms", self.retry.confirm_poll_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ClientError::Config(format!("{name} must be positive")));
            }
        }
        if self.retry.best_block_max_attempts == 0 {
            return Err(ClientError::Config(
                "retry.best_block_max_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}

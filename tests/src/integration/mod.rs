//! Cross-component flows.

pub mod offchain;
pub mod submission;
pub mod sync;

use std::sync::Arc;

use appchain_client::{AppchainClient, ClientConfig, InMemoryLedger};
use appchain_telemetry::BridgeMetrics;

/// Service address that marks off-chain transfers in these flows.
pub const MARKER: &str = "0xOffChain";

/// Local chain identifiers reported by the simulated broker.
pub const BXH_ID: &str = "1356";
/// Local appchain identifier.
pub const CHAIN_ID: &str = "eth1";

/// A client over `ledger` with the testing config and the off-chain marker set.
pub fn client_over(ledger: &Arc<InMemoryLedger>, config: ClientConfig) -> AppchainClient {
    ledger.set_chain_id(BXH_ID, CHAIN_ID);
    AppchainClient::new(
        config,
        ledger.clone(),
        ledger.clone(),
        Arc::new(BridgeMetrics::new().expect("metrics registry")),
    )
    .expect("valid testing config")
}

/// Testing config with the off-chain marker.
pub fn testing_config() -> ClientConfig {
    let mut config = ClientConfig::for_testing();
    config.ether.off_chain_addr = MARKER.to_string();
    config
}

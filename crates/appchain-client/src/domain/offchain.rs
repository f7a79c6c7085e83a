//! # Off-chain Transfer Types
//!
//! Requests, responses and file metadata of the sharded off-chain transfer.

use serde::{Deserialize, Serialize};

use super::value_objects::{DataOutcome, ShardKey, ShardTag};

/// Content function that marks an off-chain fetch.
pub const OFF_CHAIN_FUNC: &str = "interchainGet";

/// Request for data held by a peer chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainDataRequest {
    /// Transfer index.
    pub index: u64,
    /// Requesting side (composite `bxhID:chainID:serviceID` key).
    pub from: String,
    /// Peer holding the data.
    pub to: String,
    /// Resource locator on the peer.
    pub req: Vec<u8>,
}

/// Peer response announcing shards (or a failure).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainDataResponse {
    /// Outcome tag.
    pub outcome: DataOutcome,
    /// Logical data identifier on success, failure reason otherwise.
    pub msg: String,
    /// Transfer source.
    pub from: String,
    /// Transfer destination.
    pub to: String,
    /// Transfer index.
    pub index: u64,
    /// Shard count.
    pub shard_tag: ShardTag,
    /// Directory holding the shard files.
    pub data: Vec<u8>,
}

impl OffChainDataResponse {
    /// Keys of all shards, in reassembly order.
    pub fn shard_keys(&self) -> impl Iterator<Item = ShardKey> + '_ {
        let size = self.shard_tag.shard_size;
        (1..=size).map(move |shard| ShardKey {
            from: self.from.clone(),
            to: self.to.clone(),
            index: self.index,
            shard,
            shard_size: size,
        })
    }
}

/// Local file metadata returned for a data request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainDataInfo {
    /// Base file name.
    pub filename: String,
    /// Size in bytes.
    pub filesize: u64,
    /// Path as requested.
    pub filepath: String,
}

//! # Call Planning
//!
//! Decides which ledger method a message or receipt maps to and shapes its
//! arguments.
//!
//! Content arguments start with an 8-byte big-endian type tag. For `Multi`
//! messages the second argument is the 8-byte big-endian group size `num`
//! and the rest is split into groups of `num` arguments, one group per
//! sub-transaction.

use crate::domain::{
    invariant_multi_args_divisible, ClientError, IbtpType, TransactionStatus,
};

/// Ledger call shape for an interchain message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterchainCall {
    /// One transaction with the tag stripped.
    Single(Vec<Vec<u8>>),
    /// One argument group per sub-transaction.
    Multi(Vec<Vec<Vec<u8>>>),
}

/// Ledger method used for a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptRoute {
    /// `invokeReceipt`
    Single,
    /// `invokeMultiReceipt`
    Multi,
}

/// Decode an 8-byte big-endian integer argument.
pub fn decode_u64_arg(arg: &[u8]) -> Result<u64, ClientError> {
    let bytes: [u8; 8] = arg
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            ClientError::Format(format!("expected 8-byte integer argument, got {} bytes", arg.len()))
        })?;
    Ok(u64::from_be_bytes(bytes))
}

/// Encode an integer argument.
pub fn encode_u64_arg(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Type tag carried in the first content argument.
pub fn type_tag(args: &[Vec<u8>]) -> Result<u64, ClientError> {
    let first = args
        .first()
        .ok_or_else(|| ClientError::Format("content carries no type tag".to_string()))?;
    decode_u64_arg(first)
}

/// Shape content arguments into a ledger call.
pub fn plan_interchain(args: &[Vec<u8>]) -> Result<InterchainCall, ClientError> {
    let tag = type_tag(args)?;
    if tag != IbtpType::Multi.as_u64() {
        return Ok(InterchainCall::Single(args[1..].to_vec()));
    }

    let num_arg = args.get(1).ok_or_else(|| {
        ClientError::Format("multi-transaction content carries no group size".to_string())
    })?;
    let num = decode_u64_arg(num_arg)?;
    let trailing = &args[2..];
    invariant_multi_args_divisible(trailing.len(), num)?;

    let groups = trailing
        .chunks(num as usize)
        .map(<[Vec<u8>]>::to_vec)
        .collect();
    Ok(InterchainCall::Multi(groups))
}

/// Pick the receipt method.
///
/// More than one sub-result, or no sub-result for a transaction that is past
/// `Begin` (the source must roll back), goes to the multi path.
pub fn route_receipt(multi_status: &[bool], tx_status: TransactionStatus) -> ReceiptRoute {
    if multi_status.len() > 1
        || (multi_status.is_empty() && tx_status != TransactionStatus::Begin)
    {
        ReceiptRoute::Multi
    } else {
        ReceiptRoute::Single
    }
}

/// Join each group with commas, for diagnostics.
pub fn join_groups(groups: &[Vec<Vec<u8>>]) -> Vec<Vec<u8>> {
    groups.iter().map(|g| g.join(&b","[..])).collect()
}

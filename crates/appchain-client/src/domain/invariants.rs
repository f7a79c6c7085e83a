//! # Domain Invariants
//!
//! Rules every submission and confirmation path checks.

use super::errors::ClientError;

/// Invariant: multi-transaction arguments partition evenly.
///
/// `trailing` arguments (after the type tag and arity) must split into
/// groups of exactly `num`.
pub fn invariant_multi_args_divisible(trailing: usize, num: u64) -> Result<(), ClientError> {
    if num == 0 {
        return Err(ClientError::Format(
            "multi-transaction arity must be positive".to_string(),
        ));
    }
    if trailing as u64 % num != 0 {
        return Err(ClientError::Format(
            "format error for IBTP carrying multiple transactions".to_string(),
        ));
    }
    Ok(())
}

/// Invariant: the ledger advanced `min_confirm` blocks past `start`.
pub fn invariant_confirmation_depth(start: u64, current: u64, min_confirm: u64) -> bool {
    current.saturating_sub(start) >= min_confirm
}

/// Invariant: finalized upper bound without underflow.
///
/// Returns `None` while the chain is shorter than the threshold.
pub fn finalized_upper_bound(latest: u64, threshold: u64) -> Option<u64> {
    latest.checked_sub(threshold)
}

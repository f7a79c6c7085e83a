//! # Algorithms
//!
//! Pure logic: retry loop, call planning, event conversion and off-chain
//! need detection.

pub mod call_plan;
pub mod converter;
pub mod offchain;
pub mod retry;

pub use call_plan::{
    decode_u64_arg, encode_u64_arg, join_groups, plan_interchain, route_receipt, type_tag,
    InterchainCall, ReceiptRoute,
};
pub use converter::{convert_event_to_ibtp, event_content, generate_receipt};
pub use offchain::{
    composite_key, construct_request, interchain_need, is_marker_service, is_off_chain_fetch,
    receipt_need,
};
pub use retry::{retry, Backoff, RetryError, RetryPolicy};

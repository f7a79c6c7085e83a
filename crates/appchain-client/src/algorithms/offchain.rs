//! # Off-chain Need Detection
//!
//! Recognizes messages whose data lives off-chain and builds the matching
//! fetch request.

use crate::domain::{
    ClientError, Content, Ibtp, IbtpResult, OffChainDataRequest, OFF_CHAIN_FUNC,
};

/// Composite `bxhID:chainID:serviceID` key.
pub fn composite_key(bxh_id: &str, chain_id: &str, service_id: &str) -> String {
    format!("{bxh_id}:{chain_id}:{service_id}")
}

/// Whether the destination service is the off-chain marker.
pub fn is_marker_service(service_id: &str, marker: &str) -> bool {
    !marker.is_empty() && service_id.eq_ignore_ascii_case(marker)
}

/// Whether content asks for off-chain data.
///
/// Needs the type tag and the resource locator argument.
pub fn is_off_chain_fetch(content: &Content) -> bool {
    content.func == OFF_CHAIN_FUNC && content.args.len() >= 2
}

/// Off-chain need on the interchain path. Returns the locator to request.
pub fn interchain_need<'a>(
    service_id: &str,
    marker: &str,
    content: &'a Content,
) -> Option<&'a [u8]> {
    if is_marker_service(service_id, marker) && is_off_chain_fetch(content) {
        content.args.get(1).map(Vec::as_slice)
    } else {
        None
    }
}

/// Off-chain need on the receipt path. Returns the locator to request.
///
/// `outbound` is the message this receipt answers.
pub fn receipt_need<'a>(
    outbound: &Ibtp,
    result: &'a IbtpResult,
) -> Result<Option<&'a [u8]>, ClientError> {
    let content = outbound.content()?;
    if !is_off_chain_fetch(&content) {
        return Ok(None);
    }
    Ok(result.first_value())
}

/// Build a fetch request.
pub fn construct_request(
    index: u64,
    from: impl Into<String>,
    to: impl Into<String>,
    req: &[u8],
) -> OffChainDataRequest {
    OffChainDataRequest {
        index,
        from: from.into(),
        to: to.into(),
        req: req.to_vec(),
    }
}

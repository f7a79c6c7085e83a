//! # Event Conversion
//!
//! Turns broker events and stored receipt results into interchain messages.

use chrono::Utc;

use crate::domain::{
    ClientError, Content, Ibtp, IbtpResult, IbtpType, InterchainEvent, Payload, ReceiptMessage,
    ResultData, ServicePair, PLACEHOLDER_PROOF,
};

/// Current time in nanoseconds since the Unix epoch.
fn now_nanos() -> i64 {
    Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros().saturating_mul(1_000))
}

fn split_args(args: &str) -> Vec<Vec<u8>> {
    args.split(',').map(|a| a.as_bytes().to_vec()).collect()
}

/// Build the call content of an event.
///
/// `funcs` must hold exactly `call,callback,rollback`.
pub fn event_content(event: &InterchainEvent) -> Result<Content, ClientError> {
    let funcs: Vec<&str> = event.funcs.split(',').collect();
    let [func, callback, rollback] = funcs.as_slice() else {
        return Err(ClientError::Format(format!(
            "expected 3 functions, cur: {}",
            event.funcs
        )));
    };

    let args = split_args(&event.args);
    Ok(Content {
        src_contract_id: event.src_contract.clone(),
        dst_contract_id: event.dst_contract.clone(),
        func: func.to_string(),
        args_cb: args.clone(),
        args_rb: args.clone(),
        args,
        callback: callback.to_string(),
        rollback: rollback.to_string(),
    })
}

/// Convert a broker event into an interchain message.
pub fn convert_event_to_ibtp(
    event: &InterchainEvent,
    typ: IbtpType,
) -> Result<Ibtp, ClientError> {
    let content = event_content(event)?;
    Ok(Ibtp {
        from: event.src_full_id.clone(),
        to: event.dst_full_id.clone(),
        index: event.index,
        typ,
        timestamp: now_nanos(),
        proof: PLACEHOLDER_PROOF.to_vec(),
        payload: Payload::seal(event.encrypt, &content)?,
        timeout_height: 0,
    })
}

/// Build the receipt message for a stored result.
pub fn generate_receipt(
    pair: &ServicePair,
    index: u64,
    stored: &ReceiptMessage,
) -> Result<Ibtp, ClientError> {
    let typ = IbtpType::try_from(stored.typ)?;
    let result = IbtpResult {
        data: stored
            .data
            .iter()
            .map(|values| ResultData {
                data: values.clone(),
            })
            .collect(),
        multi_status: stored.multi_status.clone(),
    };

    Ok(Ibtp {
        from: pair.from.clone(),
        to: pair.to.clone(),
        index,
        typ,
        timestamp: now_nanos(),
        proof: Vec::new(),
        payload: Payload::seal(stored.encrypt, &result)?,
        timeout_height: 0,
    })
}

//! Structured log helpers.
//!
//! Every bridge log line about a message or a transaction carries the same
//! field names so that log pipelines can join them:
//! - `component`: emitting component (submitter, header_pool, ...)
//! - `from` / `to` / `index`: interchain message identity
//! - `tx_hash`: ledger transaction hash (hex)

/// Log an interchain-message event with standard fields.
#[macro_export]
macro_rules! log_ibtp_event {
    ($level:ident, $component:expr, $msg:expr, $from:expr, $to:expr, $index:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            from = %$from,
            to = %$to,
            index = $index,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a ledger-transaction event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $component:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}

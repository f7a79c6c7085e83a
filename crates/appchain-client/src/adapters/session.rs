//! # Ledger Session Adapter
//!
//! Typed broker-contract calls over the [`LedgerContract`] port.
//!
//! Two variants exist: [`RelayedSession`] talks to the relay broker and
//! [`DirectSession`] to the direct broker. The variant is chosen once from
//! [`SessionMode`] when the client is built. Calls a variant does not
//! support fail with [`LedgerError::Unsupported`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    AppchainInfo, Hash, InterchainEvent, LedgerError, ReceiptMessage, ServicePair, SessionMode,
};
use crate::ports::outbound::{AbiValue, LedgerContract};

/// Broker contract method names.
pub mod methods {
    /// Execute one interchain call.
    pub const INVOKE_INTERCHAIN: &str = "invokeInterchain";
    /// Execute a multi-transaction interchain call.
    pub const INVOKE_MULTI_INTERCHAIN: &str = "invokeMultiInterchain";
    /// Deliver one receipt.
    pub const INVOKE_RECEIPT: &str = "invokeReceipt";
    /// Deliver a multi-transaction receipt.
    pub const INVOKE_MULTI_RECEIPT: &str = "invokeMultiReceipt";
    /// Execute a batch of interchain calls.
    pub const INVOKE_INTERCHAINS: &str = "invokeInterchains";
    /// Inbound counters.
    pub const GET_INNER_META: &str = "getInnerMeta";
    /// Outbound counters.
    pub const GET_OUTER_META: &str = "getOuterMeta";
    /// Callback counters.
    pub const GET_CALLBACK_META: &str = "getCallbackMeta";
    /// Destination rollback counters.
    pub const GET_DST_ROLLBACK_META: &str = "getDstRollbackMeta";
    /// Relay hub and chain identifiers.
    pub const GET_CHAIN_ID: &str = "getChainID";
    /// Registered local services.
    pub const GET_LOCAL_SERVICE_LIST: &str = "getLocalServiceList";
    /// Peer appchain registration.
    pub const GET_APPCHAIN_INFO: &str = "getAppchainInfo";
    /// Stored receipt results.
    pub const GET_RECEIPT_MESSAGE: &str = "getReceiptMessage";
    /// Stored outbound message.
    pub const GET_OUT_MESSAGE: &str = "getOutMessage";
    /// Direct transaction timing.
    pub const GET_DIRECT_TRANSACTION_META: &str = "getDirectTransactionMeta";
}

/// Header fields of an interchain invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterchainCallHead {
    /// Full source service identifier.
    pub src_full_id: String,
    /// Local destination contract.
    pub dest_addr: String,
    /// Sequence index.
    pub index: u64,
    /// IBTP type code.
    pub req_type: u64,
    /// Function to call.
    pub call_func: String,
    /// Transaction status code.
    pub tx_status: u64,
    /// Multi-signature shares.
    pub multi_sign: Vec<Vec<u8>>,
    /// Whether arguments are encrypted.
    pub encrypt: bool,
}

impl InterchainCallHead {
    fn encode(&self, body: AbiValue) -> Vec<AbiValue> {
        vec![
            AbiValue::Str(self.src_full_id.clone()),
            AbiValue::Str(self.dest_addr.clone()),
            AbiValue::Uint(self.index),
            AbiValue::Uint(self.req_type),
            AbiValue::Str(self.call_func.clone()),
            body,
            AbiValue::Uint(self.tx_status),
            AbiValue::bytes_list(&self.multi_sign),
            AbiValue::Bool(self.encrypt),
        ]
    }
}

/// Header fields of a receipt invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptCallHead {
    /// Local source contract.
    pub src_addr: String,
    /// Full destination service identifier.
    pub dst_full_id: String,
    /// Sequence index.
    pub index: u64,
    /// IBTP type code.
    pub req_type: u64,
    /// Transaction status code.
    pub tx_status: u64,
    /// Multi-signature shares.
    pub multi_sign: Vec<Vec<u8>>,
}

impl ReceiptCallHead {
    fn encode(&self, results: &[Vec<Vec<u8>>], multi_status: Option<&[bool]>) -> Vec<AbiValue> {
        let mut args = vec![
            AbiValue::Str(self.src_addr.clone()),
            AbiValue::Str(self.dst_full_id.clone()),
            AbiValue::Uint(self.index),
            AbiValue::Uint(self.req_type),
            AbiValue::bytes_groups(results),
        ];
        if let Some(statuses) = multi_status {
            args.push(AbiValue::Array(
                statuses.iter().copied().map(AbiValue::Bool).collect(),
            ));
        }
        args.push(AbiValue::Uint(self.tx_status));
        args.push(AbiValue::bytes_list(&self.multi_sign));
        args
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::RelayedSession {}
    impl Sealed for super::DirectSession {}
}

/// Ledger session capability.
#[async_trait]
pub trait LedgerSession: sealed::Sealed + Send + Sync {
    /// Mode this session was built for.
    fn mode(&self) -> SessionMode;

    /// Shared broker call encoder.
    #[doc(hidden)]
    fn broker(&self) -> &BrokerCalls;

    /// Execute one interchain call.
    async fn invoke_interchain(
        &self,
        head: &InterchainCallHead,
        args: &[Vec<u8>],
    ) -> Result<Hash, LedgerError> {
        self.broker()
            .transact(methods::INVOKE_INTERCHAIN, head.encode(AbiValue::bytes_list(args)))
            .await
    }

    /// Execute a multi-transaction call, one argument group per sub-transaction.
    async fn invoke_multi_interchain(
        &self,
        head: &InterchainCallHead,
        groups: &[Vec<Vec<u8>>],
    ) -> Result<Hash, LedgerError> {
        self.broker()
            .transact(
                methods::INVOKE_MULTI_INTERCHAIN,
                head.encode(AbiValue::bytes_groups(groups)),
            )
            .await
    }

    /// Deliver one receipt.
    async fn invoke_receipt(
        &self,
        head: &ReceiptCallHead,
        results: &[Vec<Vec<u8>>],
    ) -> Result<Hash, LedgerError> {
        self.broker()
            .transact(methods::INVOKE_RECEIPT, head.encode(results, None))
            .await
    }

    /// Deliver a multi-transaction receipt.
    async fn invoke_multi_receipt(
        &self,
        head: &ReceiptCallHead,
        results: &[Vec<Vec<u8>>],
        multi_status: &[bool],
    ) -> Result<Hash, LedgerError> {
        self.broker()
            .transact(
                methods::INVOKE_MULTI_RECEIPT,
                head.encode(results, Some(multi_status)),
            )
            .await
    }

    /// Execute several interchain calls in one transaction.
    async fn invoke_interchains(
        &self,
        _heads: &[InterchainCallHead],
        _args: &[Vec<Vec<u8>>],
    ) -> Result<Hash, LedgerError> {
        Err(self.unsupported("invoke_interchains"))
    }

    /// Inbound counters as parallel id/index lists.
    async fn get_inner_meta(&self) -> Result<(Vec<String>, Vec<u64>), LedgerError> {
        self.broker().meta(methods::GET_INNER_META).await
    }

    /// Outbound counters.
    async fn get_outer_meta(&self) -> Result<(Vec<String>, Vec<u64>), LedgerError> {
        self.broker().meta(methods::GET_OUTER_META).await
    }

    /// Callback counters.
    async fn get_callback_meta(&self) -> Result<(Vec<String>, Vec<u64>), LedgerError> {
        self.broker().meta(methods::GET_CALLBACK_META).await
    }

    /// Destination rollback counters.
    async fn get_dst_rollback_meta(&self) -> Result<(Vec<String>, Vec<u64>), LedgerError> {
        self.broker().meta(methods::GET_DST_ROLLBACK_META).await
    }

    /// `(bxh_id, chain_id)`.
    async fn get_chain_id(&self) -> Result<(String, String), LedgerError> {
        let [bxh, chain] = self
            .broker()
            .call::<2>(methods::GET_CHAIN_ID, Vec::new())
            .await?;
        Ok((bxh.into_string()?, chain.into_string()?))
    }

    /// Registered local services.
    async fn get_local_service_list(&self) -> Result<Vec<String>, LedgerError> {
        let [list] = self
            .broker()
            .call::<1>(methods::GET_LOCAL_SERVICE_LIST, Vec::new())
            .await?;
        list.into_list(AbiValue::into_string)
    }

    /// Peer appchain registration.
    async fn get_appchain_info(&self, _chain_id: &str) -> Result<AppchainInfo, LedgerError> {
        Err(self.unsupported("get_appchain_info"))
    }

    /// Stored receipt results.
    async fn get_receipt_message(
        &self,
        pair: &ServicePair,
        index: u64,
    ) -> Result<ReceiptMessage, LedgerError> {
        let [data, typ, encrypt, statuses] = self
            .broker()
            .call::<4>(
                methods::GET_RECEIPT_MESSAGE,
                vec![AbiValue::Str(pair.to_string()), AbiValue::Uint(index)],
            )
            .await?;
        Ok(ReceiptMessage {
            data: data.into_list(|group| group.into_list(AbiValue::into_bytes))?,
            typ: typ.into_u64()?,
            encrypt: encrypt.into_bool()?,
            multi_status: statuses.into_list(AbiValue::into_bool)?,
        })
    }

    /// Stored outbound message, as the event that emitted it.
    async fn get_out_message(
        &self,
        pair: &ServicePair,
        index: u64,
    ) -> Result<InterchainEvent, LedgerError> {
        let [src_contract, dst_contract, funcs, args, encrypt] = self
            .broker()
            .call::<5>(
                methods::GET_OUT_MESSAGE,
                vec![AbiValue::Str(pair.to_string()), AbiValue::Uint(index)],
            )
            .await?;
        Ok(InterchainEvent {
            index,
            src_full_id: pair.from.clone(),
            dst_full_id: pair.to.clone(),
            src_contract: src_contract.into_string()?,
            dst_contract: dst_contract.into_string()?,
            funcs: funcs.into_string()?,
            args: args.into_string()?,
            encrypt: encrypt.into_bool()?,
            block_number: 0,
        })
    }

    /// `(timestamp, tx_status)` of a direct transaction.
    async fn get_direct_transaction_meta(&self, _ibtp_id: &str) -> Result<(u64, u64), LedgerError> {
        Err(self.unsupported("get_direct_transaction_meta"))
    }

    /// Error for an operation this variant does not offer.
    #[doc(hidden)]
    fn unsupported(&self, operation: &'static str) -> LedgerError {
        LedgerError::Unsupported {
            mode: self.mode().as_str(),
            operation,
        }
    }
}

/// Broker call helper shared by both session variants.
pub struct BrokerCalls {
    contract: Arc<dyn LedgerContract>,
}

impl BrokerCalls {
    async fn transact(&self, method: &str, args: Vec<AbiValue>) -> Result<Hash, LedgerError> {
        self.contract.transact(method, args).await
    }

    async fn call<const N: usize>(
        &self,
        method: &str,
        args: Vec<AbiValue>,
    ) -> Result<[AbiValue; N], LedgerError> {
        let outputs = self.contract.call(method, args).await?;
        let got = outputs.len();
        <[AbiValue; N]>::try_from(outputs).map_err(|_| {
            LedgerError::Decode(format!("{method}: expected {N} outputs, got {got}"))
        })
    }

    async fn meta(&self, method: &str) -> Result<(Vec<String>, Vec<u64>), LedgerError> {
        let [ids, indices] = self.call::<2>(method, Vec::new()).await?;
        Ok((
            ids.into_list(AbiValue::into_string)?,
            indices.into_list(AbiValue::into_u64)?,
        ))
    }
}

/// Session against the relay broker.
pub struct RelayedSession {
    broker: BrokerCalls,
}

impl RelayedSession {
    /// Wrap a relay broker contract.
    pub fn new(contract: Arc<dyn LedgerContract>) -> Self {
        Self {
            broker: BrokerCalls { contract },
        }
    }
}

#[async_trait]
impl LedgerSession for RelayedSession {
    fn mode(&self) -> SessionMode {
        SessionMode::Relay
    }

    fn broker(&self) -> &BrokerCalls {
        &self.broker
    }

    async fn invoke_interchains(
        &self,
        heads: &[InterchainCallHead],
        args: &[Vec<Vec<u8>>],
    ) -> Result<Hash, LedgerError> {
        if heads.len() != args.len() {
            return Err(LedgerError::Decode(format!(
                "batch of {} calls carries {} argument lists",
                heads.len(),
                args.len()
            )));
        }
        let encoded = encode_batch(heads, args);
        self.broker
            .transact(methods::INVOKE_INTERCHAINS, encoded)
            .await
    }
}

fn encode_batch(heads: &[InterchainCallHead], args: &[Vec<Vec<u8>>]) -> Vec<AbiValue> {
    fn column(
        heads: &[InterchainCallHead],
        f: impl Fn(&InterchainCallHead) -> AbiValue,
    ) -> AbiValue {
        AbiValue::Array(heads.iter().map(f).collect())
    }

    vec![
        column(heads, |h| AbiValue::Str(h.src_full_id.clone())),
        column(heads, |h| AbiValue::Str(h.dest_addr.clone())),
        column(heads, |h| AbiValue::Uint(h.index)),
        column(heads, |h| AbiValue::Uint(h.req_type)),
        column(heads, |h| AbiValue::Str(h.call_func.clone())),
        AbiValue::bytes_groups(args),
        column(heads, |h| AbiValue::Uint(h.tx_status)),
        column(heads, |h| AbiValue::bytes_list(&h.multi_sign)),
        column(heads, |h| AbiValue::Bool(h.encrypt)),
    ]
}

/// Session against the direct broker.
pub struct DirectSession {
    broker: BrokerCalls,
}

impl DirectSession {
    /// Wrap a direct broker contract.
    pub fn new(contract: Arc<dyn LedgerContract>) -> Self {
        Self {
            broker: BrokerCalls { contract },
        }
    }
}

#[async_trait]
impl LedgerSession for DirectSession {
    fn mode(&self) -> SessionMode {
        SessionMode::Direct
    }

    fn broker(&self) -> &BrokerCalls {
        &self.broker
    }

    async fn get_appchain_info(&self, chain_id: &str) -> Result<AppchainInfo, LedgerError> {
        let [broker, trust_root, rule] = self
            .broker
            .call::<3>(
                methods::GET_APPCHAIN_INFO,
                vec![AbiValue::Str(chain_id.to_string())],
            )
            .await?;
        Ok(AppchainInfo {
            broker: broker.into_string()?,
            trust_root: trust_root.into_bytes()?,
            rule_address: rule.into_address_hex()?,
        })
    }

    async fn get_direct_transaction_meta(&self, ibtp_id: &str) -> Result<(u64, u64), LedgerError> {
        let [timestamp, tx_status] = self
            .broker
            .call::<2>(
                methods::GET_DIRECT_TRANSACTION_META,
                vec![AbiValue::Str(ibtp_id.to_string())],
            )
            .await?;
        Ok((timestamp.into_u64()?, tx_status.into_u64()?))
    }
}

/// Build the session variant for `mode`.
pub fn open_session(mode: SessionMode, contract: Arc<dyn LedgerContract>) -> Arc<dyn LedgerSession> {
    match mode {
        SessionMode::Relay => Arc::new(RelayedSession::new(contract)),
        SessionMode::Direct => Arc::new(DirectSession::new(contract)),
    }
}

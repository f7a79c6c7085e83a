//! # Ethereum Ledger Adapter
//!
//! [`LedgerContract`] and [`LedgerRpc`] over a websocket JSON-RPC node.
//!
//! Broker calls are ABI-encoded from the signature table in [`BrokerAbi`]
//! and sent from the configured signing key. Interchain events are read with
//! `eth_getLogs` and decoded as `throwInterchainEvent`.
//!
//! Every RPC failure maps to [`LedgerError::Transport`]; the retry layer
//! tells reverts apart by their message.

use std::collections::HashMap;
use std::path::Path;

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::Function;
use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address as EthAddress, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::session::methods;
use crate::config::EtherConfig;
use crate::domain::{
    BlockHeader, ClientError, Hash, InterchainEvent, LedgerError, ReceiptStatus,
    TransactionReceipt,
};
use crate::ports::outbound::{AbiValue, LedgerContract, LedgerRpc};

sol! {
    /// Emitted by the broker for every outbound interchain call.
    event throwInterchainEvent(
        uint64 index,
        string dstFullID,
        string srcFullID,
        string srcContract,
        string dstContract,
        string funcs,
        string args,
        bool encrypt
    );
}

/// Human-readable broker signatures, keyed by method name.
const BROKER_SIGNATURES: &[(&str, &str)] = &[
    (
        methods::INVOKE_INTERCHAIN,
        "function invokeInterchain(string,string,uint64,uint64,string,bytes[],uint64,bytes[],bool)",
    ),
    (
        methods::INVOKE_MULTI_INTERCHAIN,
        "function invokeMultiInterchain(string,string,uint64,uint64,string,bytes[][],uint64,bytes[],bool)",
    ),
    (
        methods::INVOKE_RECEIPT,
        "function invokeReceipt(string,string,uint64,uint64,bytes[][],uint64,bytes[])",
    ),
    (
        methods::INVOKE_MULTI_RECEIPT,
        "function invokeMultiReceipt(string,string,uint64,uint64,bytes[][],bool[],uint64,bytes[])",
    ),
    (
        methods::INVOKE_INTERCHAINS,
        "function invokeInterchains(string[],string[],uint64[],uint64[],string[],bytes[][],uint64[],bytes[][],bool[])",
    ),
    (
        methods::GET_INNER_META,
        "function getInnerMeta() returns (string[],uint64[])",
    ),
    (
        methods::GET_OUTER_META,
        "function getOuterMeta() returns (string[],uint64[])",
    ),
    (
        methods::GET_CALLBACK_META,
        "function getCallbackMeta() returns (string[],uint64[])",
    ),
    (
        methods::GET_DST_ROLLBACK_META,
        "function getDstRollbackMeta() returns (string[],uint64[])",
    ),
    (
        methods::GET_CHAIN_ID,
        "function getChainID() returns (string,string)",
    ),
    (
        methods::GET_LOCAL_SERVICE_LIST,
        "function getLocalServiceList() returns (string[])",
    ),
    (
        methods::GET_APPCHAIN_INFO,
        "function getAppchainInfo(string) returns (string,bytes,address)",
    ),
    (
        methods::GET_RECEIPT_MESSAGE,
        "function getReceiptMessage(string,uint64) returns (bytes[][],uint64,bool,bool[])",
    ),
    (
        methods::GET_OUT_MESSAGE,
        "function getOutMessage(string,uint64) returns (string,string,string,string,bool)",
    ),
    (
        methods::GET_DIRECT_TRANSACTION_META,
        "function getDirectTransactionMeta(string) returns (uint64,uint64)",
    ),
];

/// Parsed broker functions.
#[derive(Debug, Clone)]
pub struct BrokerAbi {
    functions: HashMap<&'static str, Function>,
}

impl BrokerAbi {
    /// Parse the broker signature table.
    pub fn new() -> Result<Self, LedgerError> {
        let functions = BROKER_SIGNATURES
            .iter()
            .map(|(name, signature)| {
                Function::parse(signature)
                    .map(|f| (*name, f))
                    .map_err(|e| LedgerError::Decode(format!("{name}: {e}")))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { functions })
    }

    fn function(&self, method: &str) -> Result<&Function, LedgerError> {
        self.functions
            .get(method)
            .ok_or_else(|| LedgerError::Decode(format!("unknown broker method {method}")))
    }

    /// Calldata for `method(args)`.
    pub fn encode(&self, method: &str, args: &[AbiValue]) -> Result<Vec<u8>, LedgerError> {
        let values: Vec<DynSolValue> = args.iter().map(to_dyn).collect();
        self.function(method)?
            .abi_encode_input(&values)
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))
    }

    /// Return values of `method`.
    pub fn decode(&self, method: &str, data: &[u8]) -> Result<Vec<AbiValue>, LedgerError> {
        self.function(method)?
            .abi_decode_output(data, true)
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))?
            .into_iter()
            .map(from_dyn)
            .collect()
    }
}

fn to_dyn(value: &AbiValue) -> DynSolValue {
    match value {
        AbiValue::Bool(b) => DynSolValue::Bool(*b),
        AbiValue::Uint(v) => DynSolValue::Uint(U256::from(*v), 64),
        AbiValue::Str(s) => DynSolValue::String(s.clone()),
        AbiValue::Bytes(b) => DynSolValue::Bytes(b.clone()),
        AbiValue::Address(a) => DynSolValue::Address(EthAddress::from(*a)),
        AbiValue::Array(items) => DynSolValue::Array(items.iter().map(to_dyn).collect()),
    }
}

fn from_dyn(value: DynSolValue) -> Result<AbiValue, LedgerError> {
    match value {
        DynSolValue::Bool(b) => Ok(AbiValue::Bool(b)),
        DynSolValue::Uint(v, _) => u64::try_from(v)
            .map(AbiValue::Uint)
            .map_err(|_| LedgerError::Decode(format!("uint {v} exceeds 64 bits"))),
        DynSolValue::String(s) => Ok(AbiValue::Str(s)),
        DynSolValue::Bytes(b) => Ok(AbiValue::Bytes(b)),
        DynSolValue::FixedBytes(word, size) => Ok(AbiValue::Bytes(word[..size].to_vec())),
        DynSolValue::Address(a) => Ok(AbiValue::Address(a.0 .0)),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items
                .into_iter()
                .map(from_dyn)
                .collect::<Result<_, _>>()
                .map(AbiValue::Array)
        }
        other => Err(LedgerError::Decode(format!("unsupported value {other:?}"))),
    }
}

/// Decode a broker log into an interchain event.
pub fn decode_interchain_log(log: &Log) -> Result<InterchainEvent, LedgerError> {
    let decoded = log
        .log_decode::<throwInterchainEvent>()
        .map_err(|e| LedgerError::Decode(format!("throwInterchainEvent: {e}")))?;
    let ev = decoded.inner.data;
    Ok(InterchainEvent {
        index: ev.index,
        src_full_id: ev.srcFullID,
        dst_full_id: ev.dstFullID,
        src_contract: ev.srcContract,
        dst_contract: ev.dstContract,
        funcs: ev.funcs,
        args: ev.args,
        encrypt: ev.encrypt,
        block_number: log.block_number.unwrap_or_default(),
    })
}

/// Load the signing key.
///
/// A 32-byte hex string is taken as a raw private key; anything else is
/// decrypted as a JSON keystore at `key_path` with `password`.
pub fn load_signer(
    key: &[u8],
    key_path: &Path,
    password: &str,
) -> Result<PrivateKeySigner, ClientError> {
    let text = String::from_utf8_lossy(key);
    let trimmed = text.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_key.len() == 64 && hex_key.bytes().all(|b| b.is_ascii_hexdigit()) {
        let raw = hex::decode(hex_key).map_err(|e| ClientError::Signer(e.to_string()))?;
        return PrivateKeySigner::from_slice(&raw).map_err(|e| ClientError::Signer(e.to_string()));
    }
    PrivateKeySigner::decrypt_keystore(key_path, password)
        .map_err(|e| ClientError::Signer(format!("{}: {e}", key_path.display())))
}

fn transport(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Transport(e.to_string())
}

/// Broker contract and node RPC over one websocket connection.
pub struct EthereumLedger {
    provider: DynProvider,
    contract: EthAddress,
    abi: BrokerAbi,
}

impl EthereumLedger {
    /// Dial `ether.addr` and sign transactions with `signer`.
    pub async fn connect(
        ether: &EtherConfig,
        signer: PrivateKeySigner,
    ) -> Result<Self, ClientError> {
        let contract: EthAddress = ether.contract_address.parse().map_err(|e| {
            ClientError::Config(format!(
                "ether.contract_address {}: {e}",
                ether.contract_address
            ))
        })?;
        let account = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .on_ws(WsConnect::new(ether.addr.as_str()))
            .await
            .map_err(transport)?;
        let chain_id = provider.get_chain_id().await.map_err(transport)?;
        info!(
            addr = %ether.addr,
            chain_id,
            contract = %contract,
            account = %account,
            "Connected to ledger node"
        );

        Ok(Self {
            provider: provider.erased(),
            contract,
            abi: BrokerAbi::new()?,
        })
    }

    fn request(&self, method: &str, args: &[AbiValue]) -> Result<TransactionRequest, LedgerError> {
        let calldata = self.abi.encode(method, args)?;
        Ok(TransactionRequest::default()
            .with_to(self.contract)
            .with_input(calldata))
    }
}

#[async_trait]
impl LedgerContract for EthereumLedger {
    async fn transact(&self, method: &str, args: Vec<AbiValue>) -> Result<Hash, LedgerError> {
        let tx = self.request(method, &args)?;
        let pending = self.provider.send_transaction(tx).await.map_err(transport)?;
        let tx_hash = *pending.tx_hash();
        debug!(method, tx_hash = %tx_hash, "Broker transaction sent");
        Ok(tx_hash.0)
    }

    async fn call(&self, method: &str, args: Vec<AbiValue>) -> Result<Vec<AbiValue>, LedgerError> {
        let tx = self.request(method, &args)?;
        let output = self.provider.call(tx).await.map_err(transport)?;
        self.abi.decode(method, &output)
    }
}

#[async_trait]
impl LedgerRpc for EthereumLedger {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.provider.get_block_number().await.map_err(transport)
    }

    async fn header_by_number(&self, number: u64) -> Result<BlockHeader, LedgerError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(transport)?
            .ok_or_else(|| LedgerError::NotFound(format!("block {number}")))?;
        Ok(BlockHeader {
            number: block.header.number,
            hash: block.header.hash.0,
            parent_hash: block.header.parent_hash.0,
            timestamp: block.header.timestamp,
        })
    }

    async fn transaction_receipt(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        let receipt = self
            .provider
            .get_transaction_receipt(B256::from(tx_hash))
            .await
            .map_err(transport)?;
        Ok(receipt.map(|r| TransactionReceipt {
            tx_hash,
            block_number: r.block_number().unwrap_or_default(),
            status: if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Failed
            },
        }))
    }

    async fn interchain_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<InterchainEvent>, LedgerError> {
        let filter = Filter::new()
            .address(self.contract)
            .event_signature(throwInterchainEvent::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);
        let logs = self.provider.get_logs(&filter).await.map_err(transport)?;
        debug!(from_block, to_block, logs = logs.len(), "Fetched broker logs");
        logs.iter().map(decode_interchain_log).collect()
    }
}

//! In-Memory Ledger Adapter
//!
//! Simulated ledger implementing both [`LedgerContract`] and [`LedgerRpc`].
//! Used by the development runtime and by tests. Behaviour is scriptable:
//! transact failures, receipt status, receipt latency, RPC outages and block
//! production.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::adapters::session::methods;
use crate::domain::{
    AppchainInfo, BlockHeader, Hash, InterchainEvent, LedgerError, ReceiptMessage, ReceiptStatus,
    TransactionReceipt,
};
use crate::ports::outbound::{AbiValue, LedgerContract, LedgerRpc};

/// A transaction accepted by the simulated ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTransaction {
    /// Contract method.
    pub method: String,
    /// Encoded arguments.
    pub args: Vec<AbiValue>,
    /// Assigned hash.
    pub tx_hash: Hash,
    /// Inclusion height.
    pub block_number: u64,
}

/// A receipt lookup that returned a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptLookup {
    /// Transaction looked up.
    pub tx_hash: Hash,
    /// Best height when the receipt was handed out.
    pub height: u64,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    blocks_per_height_query: u64,
    height_failures: VecDeque<LedgerError>,
    height_down: bool,
    header_failure_at: Option<u64>,
    transact_failures: VecDeque<LedgerError>,
    transact_attempts: u64,
    next_receipt_status: Option<ReceiptStatus>,
    receipt_delay: u32,
    pending_receipt_polls: HashMap<Hash, u32>,
    transactions: Vec<RecordedTransaction>,
    receipts: HashMap<Hash, TransactionReceipt>,
    receipt_lookups: Vec<ReceiptLookup>,
    inner_meta: BTreeMap<String, u64>,
    outer_meta: BTreeMap<String, u64>,
    callback_meta: BTreeMap<String, u64>,
    dst_rollback_meta: BTreeMap<String, u64>,
    chain_id: (String, String),
    services: Vec<String>,
    appchains: HashMap<String, AppchainInfo>,
    direct_meta: HashMap<String, (u64, u64)>,
    out_messages: HashMap<(String, u64), InterchainEvent>,
    receipt_messages: HashMap<(String, u64), ReceiptMessage>,
    events: Vec<InterchainEvent>,
    headers_served: Vec<u64>,
}

/// Simulated ledger.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Ledger at height 0 that only advances when transactions are mined.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Ledger starting at `height`.
    pub fn with_height(height: u64) -> Self {
        let ledger = Self::new();
        ledger.state.write().height = height;
        ledger
    }

    // ---------------------------------------------------------------
    // Scripting
    // ---------------------------------------------------------------

    /// Produce `blocks` new blocks every time the best height is queried.
    pub fn set_auto_mine(&self, blocks: u64) {
        self.state.write().blocks_per_height_query = blocks;
    }

    /// Set the best height.
    pub fn set_height(&self, height: u64) {
        self.state.write().height = height;
    }

    /// Advance the best height.
    pub fn mine(&self, blocks: u64) {
        let mut state = self.state.write();
        state.height = state.height.saturating_add(blocks);
    }

    /// Fail the next height queries with these errors.
    pub fn fail_next_height_queries(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.state.write().height_failures.extend(errors);
    }

    /// Make every height query fail.
    pub fn set_height_down(&self, down: bool) {
        self.state.write().height_down = down;
    }

    /// Fail header fetches at `height`.
    pub fn fail_header_at(&self, height: Option<u64>) {
        self.state.write().header_failure_at = height;
    }

    /// Fail the next transact attempts with these errors.
    pub fn fail_next_transacts(&self, errors: impl IntoIterator<Item = LedgerError>) {
        self.state.write().transact_failures.extend(errors);
    }

    /// Status of subsequently mined receipts (default success).
    pub fn set_receipt_status(&self, status: ReceiptStatus) {
        self.state.write().next_receipt_status = Some(status);
    }

    /// Receipt lookups that return `None` before a receipt appears.
    pub fn set_receipt_delay(&self, polls: u32) {
        self.state.write().receipt_delay = polls;
    }

    /// Set an inbound counter.
    pub fn set_inner_meta(&self, service: &str, index: u64) {
        self.state.write().inner_meta.insert(service.to_string(), index);
    }

    /// Set an outbound counter.
    pub fn set_outer_meta(&self, service: &str, index: u64) {
        self.state.write().outer_meta.insert(service.to_string(), index);
    }

    /// Set a callback counter.
    pub fn set_callback_meta(&self, service: &str, index: u64) {
        self.state
            .write()
            .callback_meta
            .insert(service.to_string(), index);
    }

    /// Set a destination rollback counter.
    pub fn set_dst_rollback_meta(&self, service: &str, index: u64) {
        self.state
            .write()
            .dst_rollback_meta
            .insert(service.to_string(), index);
    }

    /// Set the relay hub and chain identifiers.
    pub fn set_chain_id(&self, bxh_id: &str, chain_id: &str) {
        self.state.write().chain_id = (bxh_id.to_string(), chain_id.to_string());
    }

    /// Register a local service.
    pub fn add_service(&self, service: &str) {
        self.state.write().services.push(service.to_string());
    }

    /// Register a peer appchain.
    pub fn add_appchain(&self, chain_id: &str, info: AppchainInfo) {
        self.state.write().appchains.insert(chain_id.to_string(), info);
    }

    /// Store direct transaction timing.
    pub fn set_direct_meta(&self, ibtp_id: &str, timestamp: u64, tx_status: u64) {
        self.state
            .write()
            .direct_meta
            .insert(ibtp_id.to_string(), (timestamp, tx_status));
    }

    /// Store an outbound message.
    pub fn put_out_message(&self, pair: &str, index: u64, event: InterchainEvent) {
        self.state
            .write()
            .out_messages
            .insert((pair.to_string(), index), event);
    }

    /// Store receipt results.
    pub fn put_receipt_message(&self, pair: &str, index: u64, message: ReceiptMessage) {
        self.state
            .write()
            .receipt_messages
            .insert((pair.to_string(), index), message);
    }

    /// Emit a broker event.
    pub fn push_event(&self, event: InterchainEvent) {
        self.state.write().events.push(event);
    }

    // ---------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------

    /// Current best height.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Accepted transactions.
    pub fn transactions(&self) -> Vec<RecordedTransaction> {
        self.state.read().transactions.clone()
    }

    /// All transact attempts, failed ones included.
    pub fn transact_attempts(&self) -> u64 {
        self.state.read().transact_attempts
    }

    /// Receipt lookups that returned a receipt.
    pub fn receipt_lookups(&self) -> Vec<ReceiptLookup> {
        self.state.read().receipt_lookups.clone()
    }

    /// Heights of every header served.
    pub fn headers_served(&self) -> Vec<u64> {
        self.state.read().headers_served.clone()
    }

    /// Executed inbound calls move the source's inner counter forward.
    fn advance_inner_meta(meta: &mut BTreeMap<String, u64>, method: &str, args: &[AbiValue]) {
        if method != methods::INVOKE_INTERCHAIN && method != methods::INVOKE_MULTI_INTERCHAIN {
            return;
        }
        if let (Some(AbiValue::Str(src)), Some(AbiValue::Uint(index))) = (args.first(), args.get(2)) {
            let entry = meta.entry(src.clone()).or_insert(0);
            *entry = (*entry).max(*index);
        }
    }

    fn meta_outputs(meta: &BTreeMap<String, u64>) -> Vec<AbiValue> {
        vec![
            AbiValue::Array(meta.keys().cloned().map(AbiValue::Str).collect()),
            AbiValue::Array(meta.values().copied().map(AbiValue::Uint).collect()),
        ]
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic hash of a labelled counter.
fn make_hash(label: &[u8], counter: u64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(counter.to_be_bytes());

    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

fn first_arg_str(method: &str, args: &[AbiValue]) -> Result<String, LedgerError> {
    match args.first() {
        Some(AbiValue::Str(s)) => Ok(s.clone()),
        _ => Err(LedgerError::Decode(format!("{method}: missing string argument"))),
    }
}

fn key_args(method: &str, args: &[AbiValue]) -> Result<(String, u64), LedgerError> {
    match args {
        [AbiValue::Str(pair), AbiValue::Uint(index)] => Ok((pair.clone(), *index)),
        _ => Err(LedgerError::Decode(format!(
            "{method}: expected (string, uint) arguments"
        ))),
    }
}

#[async_trait]
impl LedgerContract for InMemoryLedger {
    async fn transact(&self, method: &str, args: Vec<AbiValue>) -> Result<Hash, LedgerError> {
        let mut state = self.state.write();
        state.transact_attempts += 1;
        if let Some(err) = state.transact_failures.pop_front() {
            debug!(method, error = %err, "Simulated transact failure");
            return Err(err);
        }

        state.height += 1;
        let block_number = state.height;
        let tx_hash = make_hash(method.as_bytes(), state.transactions.len() as u64);
        let status = state.next_receipt_status.unwrap_or(ReceiptStatus::Success);
        let delay = state.receipt_delay;

        state.receipts.insert(
            tx_hash,
            TransactionReceipt {
                tx_hash,
                block_number,
                status,
            },
        );
        state.pending_receipt_polls.insert(tx_hash, delay);
        if status == ReceiptStatus::Success {
            Self::advance_inner_meta(&mut state.inner_meta, method, &args);
        }
        state.transactions.push(RecordedTransaction {
            method: method.to_string(),
            args,
            tx_hash,
            block_number,
        });
        Ok(tx_hash)
    }

    async fn call(&self, method: &str, args: Vec<AbiValue>) -> Result<Vec<AbiValue>, LedgerError> {
        let state = self.state.read();
        match method {
            methods::GET_INNER_META => Ok(Self::meta_outputs(&state.inner_meta)),
            methods::GET_OUTER_META => Ok(Self::meta_outputs(&state.outer_meta)),
            methods::GET_CALLBACK_META => Ok(Self::meta_outputs(&state.callback_meta)),
            methods::GET_DST_ROLLBACK_META => Ok(Self::meta_outputs(&state.dst_rollback_meta)),
            methods::GET_CHAIN_ID => Ok(vec![
                AbiValue::Str(state.chain_id.0.clone()),
                AbiValue::Str(state.chain_id.1.clone()),
            ]),
            methods::GET_LOCAL_SERVICE_LIST => Ok(vec![AbiValue::Array(
                state.services.iter().cloned().map(AbiValue::Str).collect(),
            )]),
            methods::GET_APPCHAIN_INFO => {
                let chain_id = first_arg_str(method, &args)?;
                let info = state
                    .appchains
                    .get(&chain_id)
                    .ok_or_else(|| LedgerError::NotFound(format!("appchain {chain_id}")))?;
                let mut rule = [0u8; 20];
                let raw = hex::decode(info.rule_address.trim_start_matches("0x"))
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                let len = raw.len().min(20);
                rule[20 - len..].copy_from_slice(&raw[raw.len() - len..]);
                Ok(vec![
                    AbiValue::Str(info.broker.clone()),
                    AbiValue::Bytes(info.trust_root.clone()),
                    AbiValue::Address(rule),
                ])
            }
            methods::GET_DIRECT_TRANSACTION_META => {
                let id = first_arg_str(method, &args)?;
                let (timestamp, status) = state
                    .direct_meta
                    .get(&id)
                    .copied()
                    .ok_or_else(|| LedgerError::NotFound(format!("transaction {id}")))?;
                Ok(vec![AbiValue::Uint(timestamp), AbiValue::Uint(status)])
            }
            methods::GET_RECEIPT_MESSAGE => {
                let key = key_args(method, &args)?;
                let msg = state
                    .receipt_messages
                    .get(&key)
                    .ok_or_else(|| LedgerError::NotFound(format!("receipt {}#{}", key.0, key.1)))?;
                Ok(vec![
                    AbiValue::Array(msg.data.iter().map(|g| AbiValue::bytes_list(g)).collect()),
                    AbiValue::Uint(msg.typ),
                    AbiValue::Bool(msg.encrypt),
                    AbiValue::Array(msg.multi_status.iter().copied().map(AbiValue::Bool).collect()),
                ])
            }
            methods::GET_OUT_MESSAGE => {
                let key = key_args(method, &args)?;
                let ev = state
                    .out_messages
                    .get(&key)
                    .ok_or_else(|| LedgerError::NotFound(format!("message {}#{}", key.0, key.1)))?;
                Ok(vec![
                    AbiValue::Str(ev.src_contract.clone()),
                    AbiValue::Str(ev.dst_contract.clone()),
                    AbiValue::Str(ev.funcs.clone()),
                    AbiValue::Str(ev.args.clone()),
                    AbiValue::Bool(ev.encrypt),
                ])
            }
            other => Err(LedgerError::Reverted(format!("unknown method {other}"))),
        }
    }
}

#[async_trait]
impl LedgerRpc for InMemoryLedger {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        let mut state = self.state.write();
        if let Some(err) = state.height_failures.pop_front() {
            return Err(err);
        }
        if state.height_down {
            return Err(LedgerError::Transport("connection refused".to_string()));
        }
        state.height = state.height.saturating_add(state.blocks_per_height_query);
        Ok(state.height)
    }

    async fn header_by_number(&self, number: u64) -> Result<BlockHeader, LedgerError> {
        let mut state = self.state.write();
        if state.header_failure_at == Some(number) {
            return Err(LedgerError::Transport(format!("header {number} unavailable")));
        }
        if number > state.height {
            return Err(LedgerError::NotFound(format!("header {number}")));
        }
        state.headers_served.push(number);
        Ok(BlockHeader {
            number,
            hash: make_hash(b"block", number),
            parent_hash: make_hash(b"block", number.saturating_sub(1)),
            timestamp: 1_700_000_000 + number * 12,
        })
    }

    async fn transaction_receipt(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        let mut state = self.state.write();
        if let Some(remaining) = state.pending_receipt_polls.get_mut(&tx_hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        let receipt = state.receipts.get(&tx_hash).cloned();
        if receipt.is_some() {
            let height = state.height;
            state.receipt_lookups.push(ReceiptLookup { tx_hash, height });
        }
        Ok(receipt)
    }

    async fn interchain_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<InterchainEvent>, LedgerError> {
        Ok(self
            .state
            .read()
            .events
            .iter()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .cloned()
            .collect())
    }
}

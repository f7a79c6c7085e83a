//! # Appchain Client
//!
//! Implements [`AppchainApi`] on top of the submitter, confirmation waiter,
//! header pool, event consumer and off-chain store.
//!
//! ## Channels
//!
//! | Channel              | Capacity | Producer        |
//! |----------------------|----------|-----------------|
//! | interchain messages  | 1024     | event consumer  |
//! | header batch updates | 1024     | header poster   |
//! | off-chain requests   | 1024     | submit paths    |
//!
//! Each receiver is handed out once. A stopped client cannot be restarted.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use appchain_telemetry::BridgeMetrics;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::session::{open_session, LedgerSession};
use crate::algorithms::{
    composite_key, construct_request, convert_event_to_ibtp, generate_receipt, interchain_need,
    is_marker_service, receipt_need, retry, Backoff, RetryPolicy,
};
use crate::application::confirmation::ConfirmationWaiter;
use crate::application::event_consumer::EventConsumer;
use crate::application::fatal::FatalSignal;
use crate::application::header_pool::HeaderPool;
use crate::application::offchain::OffChainStore;
use crate::application::submitter::TransactionSubmitter;
use crate::config::{ClientConfig, CHAIN_TYPE};
use crate::domain::{
    AppchainInfo, ClientError, DirectTransactionMeta, Ibtp, IbtpSubmission, IbtpType,
    LedgerError, OffChainDataInfo, OffChainDataRequest, OffChainDataResponse, ReceiptSubmission,
    ServiceMeta, ServicePair, SubmitOutcome, UpdateMeta,
};
use crate::ports::inbound::AppchainApi;
use crate::ports::outbound::{LedgerContract, LedgerRpc};

/// Capacity of the interchain message channel.
pub const IBTP_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the header batch channel.
pub const META_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the off-chain request channel.
pub const OFF_CHAIN_REQUEST_CAPACITY: usize = 1024;

/// Bridge client for one appchain.
pub struct AppchainClient {
    config: ClientConfig,
    session: Arc<dyn LedgerSession>,
    submitter: TransactionSubmitter,
    header_pool: Arc<HeaderPool>,
    event_consumer: Arc<EventConsumer>,
    offchain: OffChainStore,
    receipt_policy: RetryPolicy,
    fatal: FatalSignal,
    metrics: Arc<BridgeMetrics>,

    ibtp_tx: mpsc::Sender<Ibtp>,
    ibtp_rx: Mutex<Option<mpsc::Receiver<Ibtp>>>,
    meta_tx: mpsc::Sender<UpdateMeta>,
    meta_rx: Mutex<Option<mpsc::Receiver<UpdateMeta>>>,
    request_tx: mpsc::Sender<OffChainDataRequest>,
    request_rx: Mutex<Option<mpsc::Receiver<OffChainDataRequest>>>,

    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl AppchainClient {
    /// Build a client over the given ledger ports.
    pub fn new(
        config: ClientConfig,
        contract: Arc<dyn LedgerContract>,
        rpc: Arc<dyn LedgerRpc>,
        metrics: Arc<BridgeMetrics>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let fatal = FatalSignal::new();
        let session = open_session(config.ether.mode, contract);
        let waiter = Arc::new(ConfirmationWaiter::new(
            &config,
            Arc::clone(&rpc),
            fatal.clone(),
            Arc::clone(&metrics),
        ));
        let submitter = TransactionSubmitter::new(
            Arc::clone(&session),
            waiter,
            config.retry.submission_policy(),
            Arc::clone(&metrics),
        );
        let header_pool = Arc::new(HeaderPool::new(
            &config.header_sync,
            Arc::clone(&rpc),
            fatal.clone(),
            Arc::clone(&metrics),
        ));
        let event_consumer = Arc::new(EventConsumer::new(
            rpc,
            config.event_consumer.poll_interval(),
            config.ether.min_confirm,
            config.event_consumer.start_height,
            Arc::clone(&metrics),
        ));
        let offchain = OffChainStore::new(config.ether.off_chain_path.clone(), Arc::clone(&metrics));

        let (ibtp_tx, ibtp_rx) = mpsc::channel(IBTP_CHANNEL_CAPACITY);
        let (meta_tx, meta_rx) = mpsc::channel(META_CHANNEL_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(OFF_CHAIN_REQUEST_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            name = %config.ether.name,
            mode = config.ether.mode.as_str(),
            contract = %config.ether.contract_address,
            "Appchain client created"
        );

        Ok(Self {
            receipt_policy: config.retry.receipt_policy(),
            config,
            session,
            submitter,
            header_pool,
            event_consumer,
            offchain,
            fatal,
            metrics,
            ibtp_tx,
            ibtp_rx: Mutex::new(Some(ibtp_rx)),
            meta_tx,
            meta_rx: Mutex::new(Some(meta_rx)),
            request_tx,
            request_rx: Mutex::new(Some(request_rx)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Raised when the client hits an unrecoverable condition.
    pub fn fatal_signal(&self) -> FatalSignal {
        self.fatal.clone()
    }

    /// Bridge metrics.
    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_request(&self, request: OffChainDataRequest) -> Result<(), ClientError> {
        appchain_telemetry::log_ibtp_event!(
            info,
            "offchain",
            "Requesting off-chain data",
            request.from,
            request.to,
            request.index
        );
        self.request_tx
            .send(request)
            .await
            .map_err(|_| ClientError::ChannelClosed("off-chain requests"))?;
        self.metrics.record_offchain_request();
        Ok(())
    }

    async fn local_service_key(&self, service_id: &str) -> Result<String, ClientError> {
        let (bxh_id, chain_id) = self.session.get_chain_id().await.map_err(|e| {
            warn!(error = %e, "Failed to read chain id");
            e
        })?;
        Ok(composite_key(&bxh_id, &chain_id, service_id))
    }
}

fn zip_meta(ids: Vec<String>, indices: Vec<u64>) -> Result<ServiceMeta, ClientError> {
    if ids.len() != indices.len() {
        return Err(LedgerError::Decode(format!(
            "meta carries {} ids and {} indices",
            ids.len(),
            indices.len()
        ))
        .into());
    }
    Ok(ids.into_iter().zip(indices).collect::<HashMap<_, _>>())
}

#[async_trait]
impl AppchainApi for AppchainClient {
    fn name(&self) -> &str {
        &self.config.ether.name
    }

    fn chain_type(&self) -> &str {
        CHAIN_TYPE
    }

    async fn start(&self) -> Result<(), ClientError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyStarted);
        }

        let mut handles = Vec::new();
        if self.config.header_sync.enabled {
            handles.extend(
                self.header_pool
                    .spawn(self.meta_tx.clone(), self.shutdown_tx.subscribe()),
            );
        }
        if self.config.event_consumer.enabled {
            handles.push(
                self.event_consumer
                    .spawn(self.ibtp_tx.clone(), self.shutdown_tx.subscribe()),
            );
        }
        let spawned = handles.len();
        self.tasks.lock().extend(handles);

        info!(name = %self.config.ether.name, tasks = spawned, "Appchain client started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        self.shutdown_tx.send_replace(true);
        let handles = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!(name = %self.config.ether.name, "Appchain client stopped");
        Ok(())
    }

    async fn submit_ibtp(&self, submission: IbtpSubmission) -> Result<SubmitOutcome, ClientError> {
        if let Some(locator) = interchain_need(
            &submission.service_id,
            &self.config.ether.off_chain_addr,
            &submission.content,
        ) {
            let key = self.local_service_key(&submission.service_id).await?;
            let request = construct_request(submission.index, key, submission.from.clone(), locator);
            self.send_request(request).await?;
        }

        self.submitter.submit_interchain(&submission).await
    }

    async fn submit_receipt(
        &self,
        submission: ReceiptSubmission,
    ) -> Result<SubmitOutcome, ClientError> {
        if is_marker_service(&submission.service_id, &self.config.ether.off_chain_addr) {
            let from = self.local_service_key(&submission.service_id).await?;
            let pair = ServicePair::new(from.clone(), submission.to.clone());
            let event = self
                .session
                .get_out_message(&pair, submission.index)
                .await
                .map_err(|e| {
                    warn!(pair = %pair, error = %e, "Failed to read outbound message");
                    e
                })?;
            let outbound = convert_event_to_ibtp(&event, IbtpType::Interchain)?;
            if let Some(locator) = receipt_need(&outbound, &submission.result)? {
                let request =
                    construct_request(submission.index, from, submission.to.clone(), locator);
                self.send_request(request).await?;
            }
        }

        self.submitter.submit_receipt(&submission).await
    }

    async fn submit_ibtp_batch(
        &self,
        batch: Vec<IbtpSubmission>,
    ) -> Result<SubmitOutcome, ClientError> {
        self.submitter.submit_batch(&batch).await
    }

    async fn get_out_message(&self, service_pair: &str, index: u64) -> Result<Ibtp, ClientError> {
        let pair = ServicePair::from_str(service_pair)?;
        let event = self.session.get_out_message(&pair, index).await?;
        Ok(convert_event_to_ibtp(&event, IbtpType::Interchain)?
            .with_timeout_height(self.config.ether.timeout_height))
    }

    async fn get_receipt_message(
        &self,
        service_pair: &str,
        index: u64,
    ) -> Result<Ibtp, ClientError> {
        let pair = ServicePair::from_str(service_pair)?;
        let session = &self.session;
        let pair_ref = &pair;
        let stored = retry(&self.receipt_policy, |attempt| async move {
            session
                .get_receipt_message(pair_ref, index)
                .await
                .map_err(|e| {
                    warn!(pair = %pair_ref, index, attempt, error = %e, "Receipt message lookup failed");
                    if matches!(e, LedgerError::Transport(_)) && e.is_transient() {
                        Backoff::Transient(e)
                    } else {
                        Backoff::Permanent(e)
                    }
                })
        })
        .await
        .map_err(|e| ClientError::Ledger(e.into_inner()))?;

        generate_receipt(&pair, index, &stored)
    }

    async fn get_in_meta(&self) -> Result<ServiceMeta, ClientError> {
        let (ids, indices) = self.session.get_inner_meta().await?;
        zip_meta(ids, indices)
    }

    async fn get_out_meta(&self) -> Result<ServiceMeta, ClientError> {
        let (ids, indices) = self.session.get_outer_meta().await?;
        zip_meta(ids, indices)
    }

    async fn get_callback_meta(&self) -> Result<ServiceMeta, ClientError> {
        let (ids, indices) = self.session.get_callback_meta().await?;
        zip_meta(ids, indices)
    }

    async fn get_dst_rollback_meta(&self) -> Result<ServiceMeta, ClientError> {
        let (ids, indices) = self.session.get_dst_rollback_meta().await?;
        zip_meta(ids, indices)
    }

    async fn get_chain_id(&self) -> Result<(String, String), ClientError> {
        Ok(self.session.get_chain_id().await?)
    }

    async fn get_services(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.session.get_local_service_list().await?)
    }

    async fn get_appchain_info(&self, chain_id: &str) -> Result<AppchainInfo, ClientError> {
        Ok(self.session.get_appchain_info(chain_id).await?)
    }

    async fn get_direct_transaction_meta(
        &self,
        ibtp_id: &str,
    ) -> Result<DirectTransactionMeta, ClientError> {
        let (timestamp, tx_status) = self.session.get_direct_transaction_meta(ibtp_id).await?;
        Ok(DirectTransactionMeta {
            timestamp,
            timeout_period: self.config.ether.timeout_period,
            tx_status,
        })
    }

    async fn get_off_chain_data(
        &self,
        request: &OffChainDataRequest,
    ) -> Result<OffChainDataInfo, ClientError> {
        self.offchain.info(request).await
    }

    async fn submit_off_chain_data(
        &self,
        response: &OffChainDataResponse,
    ) -> Result<(), ClientError> {
        self.offchain.reassemble(response).await.map(|_| ())
    }

    fn take_ibtp_receiver(&self) -> Result<mpsc::Receiver<Ibtp>, ClientError> {
        self.ibtp_rx
            .lock()
            .take()
            .ok_or(ClientError::ReceiverTaken("ibtp"))
    }

    fn take_meta_receiver(&self) -> Result<mpsc::Receiver<UpdateMeta>, ClientError> {
        self.meta_rx
            .lock()
            .take()
            .ok_or(ClientError::ReceiverTaken("meta"))
    }

    fn take_off_chain_request_receiver(
        &self,
    ) -> Result<mpsc::Receiver<OffChainDataRequest>, ClientError> {
        self.request_rx
            .lock()
            .take()
            .ok_or(ClientError::ReceiverTaken("off-chain requests"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;
    use crate::algorithms::encode_u64_arg;
    use crate::domain::{
        BxhProof, Content, IbtpResult, InterchainEvent, ReceiptMessage, ResultData, SessionMode,
        TransactionStatus, OFF_CHAIN_FUNC,
    };
    use std::time::Duration;
    use tokio::time::timeout;

    const MARKER: &str = "0xOffChain";

    fn client_with(config: ClientConfig, ledger: &Arc<InMemoryLedger>) -> AppchainClient {
        AppchainClient::new(
            config,
            ledger.clone(),
            ledger.clone(),
            Arc::new(BridgeMetrics::new().unwrap()),
        )
        .unwrap()
    }

    fn client(ledger: &Arc<InMemoryLedger>) -> AppchainClient {
        let mut config = ClientConfig::for_testing();
        config.ether.off_chain_addr = MARKER.to_string();
        ledger.set_auto_mine(1);
        ledger.set_chain_id("1356", "eth1");
        client_with(config, ledger)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut config = ClientConfig::for_testing();
        config.ether.contract_address.clear();
        let result = AppchainClient::new(
            config,
            ledger.clone(),
            ledger,
            Arc::new(BridgeMetrics::new().unwrap()),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_receivers_are_taken_once() {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client(&ledger);
        assert!(client.take_ibtp_receiver().is_ok());
        assert!(matches!(
            client.take_ibtp_receiver(),
            Err(ClientError::ReceiverTaken("ibtp"))
        ));
        assert!(client.take_meta_receiver().is_ok());
        assert!(client.take_meta_receiver().is_err());
        assert!(client.take_off_chain_request_receiver().is_ok());
        assert!(client.take_off_chain_request_receiver().is_err());
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let ledger = Arc::new(InMemoryLedger::with_height(5));
        let client = client(&ledger);
        assert_eq!(client.name(), "ether-test");
        assert_eq!(client.chain_type(), CHAIN_TYPE);

        client.start().await.unwrap();
        assert!(matches!(client.start().await, Err(ClientError::AlreadyStarted)));
        timeout(Duration::from_secs(5), client.stop())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_started_client_emits_events() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        ledger.push_event(InterchainEvent {
            index: 1,
            src_full_id: "1356:eth1:0xa".into(),
            dst_full_id: "1356:eth2:0xb".into(),
            funcs: "set,,".into(),
            args: "k,v".into(),
            block_number: 3,
            ..Default::default()
        });
        let client = client(&ledger);
        let mut rx = client.take_ibtp_receiver().unwrap();
        client.start().await.unwrap();

        let ibtp = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ibtp.index, 1);
        assert_eq!(ibtp.content().unwrap().args, vec![b"k".to_vec(), b"v".to_vec()]);
        client.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_off_chain_interchain_emits_request_and_submits() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        let client = client(&ledger);
        let mut requests = client.take_off_chain_request_receiver().unwrap();

        let submission = IbtpSubmission {
            from: "1356:eth2:0xpeer".into(),
            index: 4,
            service_id: MARKER.to_lowercase(),
            typ: IbtpType::Interchain,
            content: Content {
                func: OFF_CHAIN_FUNC.into(),
                args: vec![encode_u64_arg(0), b"/remote/file.bin".to_vec()],
                ..Default::default()
            },
            proof: BxhProof::default(),
            is_encrypted: false,
        };
        let outcome = client.submit_ibtp(submission).await.unwrap();
        assert!(outcome.status);

        let request = requests.try_recv().unwrap();
        assert_eq!(request.index, 4);
        assert_eq!(request.from, format!("1356:eth1:{}", MARKER.to_lowercase()));
        assert_eq!(request.to, "1356:eth2:0xpeer");
        assert_eq!(request.req, b"/remote/file.bin");
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_off_chain_receipt_uses_first_result() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        let client = client(&ledger);
        let mut requests = client.take_off_chain_request_receiver().unwrap();

        let from = format!("1356:eth1:{MARKER}");
        let to = "1356:eth2:0xpeer".to_string();
        ledger.put_out_message(
            &format!("{from}-{to}"),
            9,
            InterchainEvent {
                funcs: format!("{OFF_CHAIN_FUNC},cb,rb"),
                args: "tag,/local/request".into(),
                ..Default::default()
            },
        );

        let submission = ReceiptSubmission {
            to: to.clone(),
            index: 9,
            service_id: MARKER.into(),
            typ: IbtpType::ReceiptSuccess,
            result: IbtpResult {
                data: vec![ResultData {
                    data: vec![b"/peer/shards".to_vec()],
                }],
                multi_status: vec![true],
            },
            proof: BxhProof {
                tx_status: TransactionStatus::Success,
                multi_sign: vec![],
            },
        };
        assert!(client.submit_receipt(submission).await.unwrap().status);

        let request = requests.try_recv().unwrap();
        assert_eq!(request.from, from);
        assert_eq!(request.to, to);
        assert_eq!(request.req, b"/peer/shards");
    }

    #[tokio::test]
    async fn test_meta_maps_ids_to_indices() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_inner_meta("1356:eth2:0xa", 3);
        ledger.set_inner_meta("1356:eth2:0xb", 7);
        ledger.set_outer_meta("1356:eth2:0xa", 1);
        let client = client(&ledger);

        let inner = client.get_in_meta().await.unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner["1356:eth2:0xb"], 7);
        assert_eq!(client.get_out_meta().await.unwrap()["1356:eth2:0xa"], 1);
        assert!(client.get_callback_meta().await.unwrap().is_empty());
        assert!(client.get_dst_rollback_meta().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inner_meta_never_decreases() {
        let ledger = Arc::new(InMemoryLedger::with_height(10));
        ledger.set_inner_meta("1356:eth2:0xother", 4);
        let client = client(&ledger);
        let src = "1356:eth2:0xsrc";

        let first = client.get_in_meta().await.unwrap();
        for _ in 0..5 {
            assert_eq!(client.get_in_meta().await.unwrap(), first);
        }

        let mut previous = first;
        for index in 1..=3u64 {
            let outcome = client
                .submit_ibtp(IbtpSubmission {
                    from: src.into(),
                    index,
                    service_id: "0xdst".into(),
                    typ: IbtpType::Interchain,
                    content: Content {
                        func: "set".into(),
                        args: vec![encode_u64_arg(IbtpType::Interchain.as_u64()), b"v".to_vec()],
                        ..Default::default()
                    },
                    proof: BxhProof {
                        tx_status: TransactionStatus::Begin,
                        multi_sign: vec![],
                    },
                    is_encrypted: false,
                })
                .await
                .unwrap();
            assert!(outcome.status);

            let current = client.get_in_meta().await.unwrap();
            for (service, idx) in &previous {
                assert!(current[service] >= *idx);
            }
            assert_eq!(current[src], index);
            assert_eq!(client.get_in_meta().await.unwrap(), current);
            previous = current;
        }
        assert_eq!(previous["1356:eth2:0xother"], 4);
    }

    #[tokio::test]
    async fn test_out_message_carries_timeout_height() {
        for mode in [SessionMode::Relay, SessionMode::Direct] {
            let ledger = Arc::new(InMemoryLedger::new());
            ledger.put_out_message(
                "1356:eth1:0xa-1356:eth2:0xb",
                4,
                InterchainEvent {
                    funcs: "set,,".into(),
                    args: "k,v".into(),
                    ..Default::default()
                },
            );
            let mut config = ClientConfig::for_testing();
            config.ether.mode = mode;
            config.ether.timeout_height = 120;
            let client = client_with(config, &ledger);

            let ibtp = client
                .get_out_message("1356:eth1:0xa-1356:eth2:0xb", 4)
                .await
                .unwrap();
            assert_eq!(ibtp.timeout_height, 120, "mode={mode:?}");
            assert_eq!(ibtp.index, 4);
            assert_eq!(ibtp.from, "1356:eth1:0xa");
            assert_eq!(ibtp.content().unwrap().func, "set");
        }
    }

    #[tokio::test]
    async fn test_receipt_message_is_rebuilt() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.put_receipt_message(
            "1356:eth1:0xa-1356:eth2:0xb",
            2,
            ReceiptMessage {
                data: vec![vec![b"ok".to_vec()]],
                typ: IbtpType::ReceiptSuccess.as_u64(),
                encrypt: false,
                multi_status: vec![true],
            },
        );
        let client = client(&ledger);

        let ibtp = client
            .get_receipt_message("1356:eth1:0xa-1356:eth2:0xb", 2)
            .await
            .unwrap();
        assert_eq!(ibtp.typ, IbtpType::ReceiptSuccess);
        assert_eq!(ibtp.from, "1356:eth1:0xa");
        assert_eq!(ibtp.to, "1356:eth2:0xb");
    }

    #[tokio::test]
    async fn test_missing_receipt_message_is_not_retried_forever() {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client(&ledger);
        let err = timeout(
            Duration::from_secs(5),
            client.get_receipt_message("a-b", 1),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, ClientError::Ledger(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_malformed_service_pair() {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client(&ledger);
        assert!(matches!(
            client.get_out_message("a-b-c", 1).await,
            Err(ClientError::InvalidServicePair(_))
        ));
        assert!(matches!(
            client.get_receipt_message("ab", 1).await,
            Err(ClientError::InvalidServicePair(_))
        ));
    }

    #[tokio::test]
    async fn test_direct_transaction_meta_reports_timeout_period() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_direct_meta("1356:eth1:0xa-1356:eth2:0xb-1", 1_700_000_000, 1);
        let mut config = ClientConfig::for_testing();
        config.ether.mode = SessionMode::Direct;
        config.ether.timeout_period = 90;
        let client = client_with(config, &ledger);

        let meta = client
            .get_direct_transaction_meta("1356:eth1:0xa-1356:eth2:0xb-1")
            .await
            .unwrap();
        assert_eq!(
            meta,
            DirectTransactionMeta {
                timestamp: 1_700_000_000,
                timeout_period: 90,
                tx_status: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_relay_mode_rejects_direct_queries() {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client(&ledger);
        assert!(matches!(
            client.get_appchain_info("eth2").await,
            Err(ClientError::Ledger(LedgerError::Unsupported { .. }))
        ));
    }
}

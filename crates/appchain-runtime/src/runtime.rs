//! Bridge process lifecycle.

use std::path::Path;
use std::sync::Arc;

use appchain_client::{
    load_signer, AppchainApi, AppchainClient, ClientConfig, EthereumLedger, InMemoryLedger,
    LedgerBackend, LedgerContract, LedgerRpc,
};
use appchain_telemetry::BridgeMetrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::credentials::Credentials;
use crate::loader::load_config;
use crate::RuntimeError;

/// Why the runtime stopped waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Operator interrupt.
    Interrupted,
    /// The client raised its fatal signal.
    Fatal(String),
}

/// Running bridge: client, credentials and the channel drain task.
pub struct BridgeRuntime {
    client: Arc<AppchainClient>,
    credentials: Option<Credentials>,
    shutdown_tx: watch::Sender<bool>,
    drain: Option<JoinHandle<()>>,
}

impl BridgeRuntime {
    /// Load configuration and credentials from `config_dir` and build the
    /// client over the configured ledger backend.
    ///
    /// The `rpc` backend unlocks the signing key and dials `ether.addr`.
    pub async fn initialize(
        config_dir: &Path,
        metrics: Arc<BridgeMetrics>,
    ) -> Result<Self, RuntimeError> {
        let config = load_config(config_dir)?;
        let credentials = Credentials::load(config_dir, &config.ether)?;
        debug!(?credentials, "Loaded signing credentials");

        let mut runtime = match config.ether.backend {
            LedgerBackend::Rpc => {
                let signer = load_signer(
                    credentials.key(),
                    credentials.key_path(),
                    credentials.password(),
                )?;
                let ledger = Arc::new(EthereumLedger::connect(&config.ether, signer).await?);
                Self::with_ports(config, ledger.clone(), ledger, metrics)?
            }
            LedgerBackend::Memory => {
                warn!(addr = %config.ether.addr, "Using in-memory development ledger");
                Self::with_ledger(config, Arc::new(InMemoryLedger::new()), metrics)?
            }
        };
        runtime.credentials = Some(credentials);
        Ok(runtime)
    }

    /// Build the client over the simulated ledger.
    pub fn with_ledger(
        config: ClientConfig,
        ledger: Arc<InMemoryLedger>,
        metrics: Arc<BridgeMetrics>,
    ) -> Result<Self, RuntimeError> {
        Self::with_ports(config, ledger.clone(), ledger, metrics)
    }

    /// Build the client over arbitrary ledger ports.
    pub fn with_ports(
        config: ClientConfig,
        contract: Arc<dyn LedgerContract>,
        rpc: Arc<dyn LedgerRpc>,
        metrics: Arc<BridgeMetrics>,
    ) -> Result<Self, RuntimeError> {
        let client = AppchainClient::new(config, contract, rpc, metrics)?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            client: Arc::new(client),
            credentials: None,
            shutdown_tx,
            drain: None,
        })
    }

    /// The bridge client.
    pub fn client(&self) -> Arc<AppchainClient> {
        Arc::clone(&self.client)
    }

    /// Loaded signing credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Start the client and the task draining its outbound channels.
    ///
    /// Without a hub connection the drained messages are only logged.
    pub async fn start(&mut self) -> Result<(), RuntimeError> {
        let mut ibtps = self.client.take_ibtp_receiver()?;
        let mut metas = self.client.take_meta_receiver()?;
        let mut requests = self.client.take_off_chain_request_receiver()?;
        self.client.start().await?;

        let mut shutdown = self.shutdown_tx.subscribe();
        self.drain = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    Some(ibtp) = ibtps.recv() => {
                        appchain_telemetry::log_ibtp_event!(
                            info, "runtime", "Outbound interchain message",
                            ibtp.from, ibtp.to, ibtp.index
                        );
                    }
                    Some(meta) = metas.recv() => {
                        info!(bytes = meta.meta.len(), "Outbound header batch");
                    }
                    Some(request) = requests.recv() => {
                        appchain_telemetry::log_ibtp_event!(
                            info, "runtime", "Outbound off-chain request",
                            request.from, request.to, request.index
                        );
                    }
                    else => break,
                }
            }
            debug!("Drain task stopped");
        }));

        info!(name = self.client.name(), "Bridge runtime started");
        Ok(())
    }

    /// Wait for Ctrl+C or a fatal client condition.
    pub async fn wait_for_exit(&self) -> ExitReason {
        let mut fatal = self.client.fatal_signal().subscribe();
        if let Some(reason) = fatal.borrow().clone() {
            return ExitReason::Fatal(reason);
        }
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
                ExitReason::Interrupted
            }
            reason = wait_fatal(&mut fatal) => ExitReason::Fatal(reason),
        }
    }

    /// Stop the client and the drain task.
    pub async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        info!("Initiating graceful shutdown...");
        self.client.stop().await?;
        self.shutdown_tx.send_replace(true);
        if let Some(drain) = self.drain.take() {
            if let Err(e) = drain.await {
                error!(error = %e, "Drain task panicked");
            }
        }
        match self.client.metrics().gather_text() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
        info!("Shutdown complete");
        Ok(())
    }
}

async fn wait_fatal(fatal: &mut watch::Receiver<Option<String>>) -> String {
    loop {
        if fatal.changed().await.is_err() {
            // signal dropped without a reason; never resolve
            std::future::pending::<()>().await;
        }
        if let Some(reason) = fatal.borrow().clone() {
            return reason;
        }
    }
}

//! # Submission Flows
//!
//! Messages from the relay hub become broker transactions; the outcome is
//! only reported after the receipt has enough confirmations.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use appchain_client::adapters::session::methods;
    use appchain_client::algorithms::encode_u64_arg;
    use appchain_client::{
        AbiValue, AppchainApi, BxhProof, Content, IbtpResult, IbtpSubmission, IbtpType,
        InMemoryLedger, LedgerError, ReceiptSubmission, ResultData, SessionMode,
        TransactionStatus,
    };
    use tokio::time::timeout;

    use crate::integration::{client_over, testing_config};

    fn interchain(index: u64, args: Vec<Vec<u8>>) -> IbtpSubmission {
        IbtpSubmission {
            from: "1356:eth2:0xpeer".into(),
            index,
            service_id: "0xlocal".into(),
            typ: IbtpType::Interchain,
            content: Content {
                func: "transfer".into(),
                args,
                ..Default::default()
            },
            proof: BxhProof {
                tx_status: TransactionStatus::Begin,
                multi_sign: vec![vec![1u8; 65], vec![2u8; 65]],
            },
            is_encrypted: false,
        }
    }

    fn receipt(index: u64, multi_status: Vec<bool>) -> ReceiptSubmission {
        ReceiptSubmission {
            to: "1356:eth2:0xpeer".into(),
            index,
            service_id: "0xlocal".into(),
            typ: IbtpType::ReceiptSuccess,
            result: IbtpResult {
                data: multi_status
                    .iter()
                    .map(|_| ResultData {
                        data: vec![b"ok".to_vec()],
                    })
                    .collect(),
                multi_status,
            },
            proof: BxhProof {
                tx_status: TransactionStatus::Success,
                multi_sign: vec![],
            },
        }
    }

    fn tag(t: IbtpType) -> Vec<u8> {
        encode_u64_arg(t.as_u64())
    }

    // =========================================================================
    // Interchain
    // =========================================================================

    #[tokio::test]
    async fn test_single_message_is_confirmed_before_success() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        ledger.set_auto_mine(1);
        let client = client_over(&ledger, testing_config());

        let outcome = timeout(
            Duration::from_secs(5),
            client.submit_ibtp(interchain(
                1,
                vec![tag(IbtpType::Interchain), b"alice".to_vec(), b"10".to_vec()],
            )),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(outcome.status);
        assert!(outcome.message.is_empty());

        let txs = ledger.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].method, methods::INVOKE_INTERCHAIN);
        assert_eq!(
            txs[0].args[5],
            AbiValue::bytes_list(&[b"alice".to_vec(), b"10".to_vec()])
        );

        // receipt handed out only once min_confirm blocks passed
        let min_confirm = client.config().ether.min_confirm;
        for lookup in ledger.receipt_lookups() {
            assert!(lookup.height >= txs[0].block_number + min_confirm);
        }
    }

    #[tokio::test]
    async fn test_multi_message_forwards_every_group() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        ledger.set_auto_mine(1);
        let client = client_over(&ledger, testing_config());

        let mut args = vec![tag(IbtpType::Multi), encode_u64_arg(3)];
        args.extend((0..9u8).map(|i| vec![b'a' + i]));
        let outcome = client.submit_ibtp(interchain(2, args)).await.unwrap();
        assert!(outcome.status);

        let txs = ledger.transactions();
        assert_eq!(txs[0].method, methods::INVOKE_MULTI_INTERCHAIN);
        let AbiValue::Array(groups) = &txs[0].args[5] else {
            panic!("groups not encoded as array");
        };
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1], AbiValue::bytes_list(&[b"d".to_vec(), b"e".to_vec(), b"f".to_vec()]));
    }

    #[tokio::test]
    async fn test_revert_is_reported_without_retry() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        ledger.set_auto_mine(1);
        ledger.fail_next_transacts([LedgerError::Reverted("index not match".into())]);
        let client = client_over(&ledger, testing_config());

        let outcome = timeout(
            Duration::from_secs(5),
            client.submit_ibtp(interchain(3, vec![tag(IbtpType::Interchain)])),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!outcome.status);
        assert!(outcome.message.contains("execution reverted"));
        assert_eq!(ledger.transact_attempts(), 1);
        assert_eq!(client.metrics().reverts(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_recover() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        ledger.set_auto_mine(1);
        ledger.fail_next_transacts([
            LedgerError::Transport("dial tcp: connection refused".into()),
            LedgerError::Transport("dial tcp: connection refused".into()),
        ]);
        let client = client_over(&ledger, testing_config());

        let outcome = client
            .submit_ibtp(interchain(4, vec![tag(IbtpType::Interchain)]))
            .await
            .unwrap();
        assert!(outcome.status);
        assert_eq!(ledger.transact_attempts(), 3);
        assert_eq!(ledger.transactions().len(), 1);
    }

    // =========================================================================
    // Receipts
    // =========================================================================

    #[tokio::test]
    async fn test_multi_status_receipt_uses_multi_method() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        ledger.set_auto_mine(1);
        let client = client_over(&ledger, testing_config());

        assert!(client.submit_receipt(receipt(5, vec![true, false, true])).await.unwrap().status);
        assert!(client.submit_receipt(receipt(6, vec![true])).await.unwrap().status);

        let called: Vec<_> = ledger.transactions().into_iter().map(|tx| tx.method).collect();
        assert_eq!(
            called,
            vec![methods::INVOKE_MULTI_RECEIPT.to_string(), methods::INVOKE_RECEIPT.to_string()]
        );
    }

    // =========================================================================
    // Batch
    // =========================================================================

    #[tokio::test]
    async fn test_batch_in_relay_mode() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        ledger.set_auto_mine(1);
        let client = client_over(&ledger, testing_config());

        let batch = vec![
            interchain(7, vec![tag(IbtpType::Interchain), b"x".to_vec()]),
            interchain(8, vec![tag(IbtpType::Interchain), b"y".to_vec()]),
        ];
        assert!(client.submit_ibtp_batch(batch).await.unwrap().status);
        assert_eq!(ledger.transactions()[0].method, methods::INVOKE_INTERCHAINS);
    }

    #[tokio::test]
    async fn test_batch_in_direct_mode_fails_fast() {
        let ledger = Arc::new(InMemoryLedger::with_height(100));
        let mut config = testing_config();
        config.ether.mode = SessionMode::Direct;
        let client = client_over(&ledger, config);

        let outcome = timeout(
            Duration::from_secs(5),
            client.submit_ibtp_batch(vec![interchain(9, vec![tag(IbtpType::Interchain)])]),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!outcome.status);
        assert_eq!(ledger.transact_attempts(), 0);
    }
}

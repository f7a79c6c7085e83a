//! # Synchronization Flows
//!
//! A started client streams finalized headers and broker events to the
//! relay hub until it is stopped.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use appchain_client::{AppchainApi, InMemoryLedger, InterchainEvent, IbtpType};
    use tokio::time::timeout;

    use crate::integration::{client_over, testing_config};

    fn event(index: u64, block_number: u64) -> InterchainEvent {
        InterchainEvent {
            index,
            src_full_id: "1356:eth1:0xlocal".into(),
            dst_full_id: "1356:eth2:0xpeer".into(),
            funcs: "transfer,confirm,".into(),
            args: "alice,10".into(),
            block_number,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_header_batches_are_contiguous_across_posts() {
        let ledger = Arc::new(InMemoryLedger::with_height(12));
        let client = client_over(&ledger, testing_config());
        let mut metas = client.take_meta_receiver().unwrap();
        client.start().await.unwrap();

        let threshold = client.config().header_sync.finality_threshold;
        let mut expected_next = 1;
        for round in 0..3 {
            let meta = timeout(Duration::from_secs(5), metas.recv())
                .await
                .unwrap()
                .unwrap();
            let headers = meta.headers().unwrap();
            assert!(!headers.is_empty(), "round {round} posted an empty batch");
            for header in &headers {
                assert_eq!(header.number, expected_next);
                assert!(header.number + threshold <= ledger.height());
                expected_next += 1;
            }
            ledger.mine(4);
        }

        timeout(Duration::from_secs(5), client.stop())
            .await
            .unwrap()
            .unwrap();
        assert!(client.metrics().batches_posted() >= 3);
    }

    #[tokio::test]
    async fn test_events_are_emitted_in_order_once() {
        let ledger = Arc::new(InMemoryLedger::with_height(20));
        for (index, block) in [(1, 3), (2, 3), (3, 7)] {
            ledger.push_event(event(index, block));
        }
        let client = client_over(&ledger, testing_config());
        let mut ibtps = client.take_ibtp_receiver().unwrap();
        client.start().await.unwrap();

        for expected in 1..=3 {
            let ibtp = timeout(Duration::from_secs(5), ibtps.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ibtp.index, expected);
            assert_eq!(ibtp.typ, IbtpType::Interchain);
            assert_eq!(ibtp.from, "1356:eth1:0xlocal");
        }

        // later polls do not replay delivered events
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ibtps.try_recv().is_err());
        client.stop().await.unwrap();
        assert_eq!(client.metrics().ibtps_emitted(), 3);
    }

    #[tokio::test]
    async fn test_header_failure_raises_fatal_signal() {
        let ledger = Arc::new(InMemoryLedger::with_height(20));
        ledger.fail_header_at(Some(4));
        let client = client_over(&ledger, testing_config());
        let _metas = client.take_meta_receiver().unwrap();
        let mut fatal = client.fatal_signal().subscribe();
        client.start().await.unwrap();

        timeout(Duration::from_secs(5), fatal.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(client
            .fatal_signal()
            .reason()
            .unwrap()
            .contains("header 4 unavailable"));
        client.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_loops_do_not_touch_ledger() {
        let ledger = Arc::new(InMemoryLedger::with_height(50));
        let mut config = testing_config();
        config.header_sync.enabled = false;
        config.event_consumer.enabled = false;
        let client = client_over(&ledger, config);
        client.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        client.stop().await.unwrap();
        assert!(ledger.headers_served().is_empty());
    }
}

//! # Off-chain Transfer Flows
//!
//! A peer announces a shard directory; the client reassembles the shards in
//! order into its off-chain directory.

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use appchain_client::{
        AppchainApi, ClientError, DataOutcome, InMemoryLedger, OffChainDataRequest,
        OffChainDataResponse, ShardTag,
    };
    use proptest::prelude::*;
    use tempfile::TempDir;

    use crate::integration::{client_over, testing_config};

    fn response(shard_dir: &Path, msg: &str, size: u64) -> OffChainDataResponse {
        OffChainDataResponse {
            outcome: DataOutcome::Success,
            msg: msg.into(),
            from: "1356:eth2:0xpeer".into(),
            to: "1356:eth1:0xOffChain".into(),
            index: 12,
            shard_tag: ShardTag {
                shard_index: 0,
                shard_size: size,
            },
            data: shard_dir.to_string_lossy().as_bytes().to_vec(),
        }
    }

    fn write_shards(resp: &OffChainDataResponse, dir: &Path, shards: &[Vec<u8>]) {
        for (key, bytes) in resp.shard_keys().zip(shards) {
            std::fs::write(dir.join(key.file_name()), bytes).unwrap();
        }
    }

    fn output_files(dir: &Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| entries.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_shards_are_reassembled_into_offchain_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("offchain");
        let mut config = testing_config();
        config.ether.off_chain_path = out.clone();
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client_over(&ledger, config);

        let resp = response(tmp.path(), "report", 4);
        let shards: Vec<Vec<u8>> = ["Lorem ", "ipsum ", "dolor ", "sit"]
            .iter()
            .map(|s| s.as_bytes().to_vec())
            .collect();
        write_shards(&resp, tmp.path(), &shards);

        client.submit_off_chain_data(&resp).await.unwrap();

        let files = output_files(&out);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("report-"));
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"Lorem ipsum dolor sit");
        assert_eq!(client.metrics().shards(), 4);
    }

    #[tokio::test]
    async fn test_failure_response_surfaces_reason() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("offchain");
        let mut config = testing_config();
        config.ether.off_chain_path = out.clone();
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client_over(&ledger, config);

        let mut resp = response(tmp.path(), "disk full", 1);
        resp.outcome = DataOutcome::Failure;

        let err = client.submit_off_chain_data(&resp).await.unwrap_err();
        assert!(matches!(err, ClientError::OffChainDataFailure { .. }));
        assert_eq!(err.to_string(), "failure:disk full");
        assert!(output_files(&out).is_empty());
    }

    #[tokio::test]
    async fn test_local_file_info_is_served() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("ledger-dump.tar");
        std::fs::write(&file, vec![7u8; 1024]).unwrap();
        let ledger = Arc::new(InMemoryLedger::new());
        let client = client_over(&ledger, testing_config());

        let info = client
            .get_off_chain_data(&OffChainDataRequest {
                index: 12,
                from: "1356:eth2:0xpeer".into(),
                to: "1356:eth1:0xOffChain".into(),
                req: file.to_string_lossy().as_bytes().to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(info.filename, "ledger-dump.tar");
        assert_eq!(info.filesize, 1024);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_reassembled_file_is_shard_concatenation(
            shards in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..128), 1..6)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let tmp = TempDir::new().unwrap();
            let out = tmp.path().join("offchain");
            let mut config = testing_config();
            config.ether.off_chain_path = out.clone();
            let ledger = Arc::new(InMemoryLedger::new());
            let client = client_over(&ledger, config);

            let resp = response(tmp.path(), "blob", shards.len() as u64);
            write_shards(&resp, tmp.path(), &shards);
            runtime.block_on(client.submit_off_chain_data(&resp)).unwrap();

            let files = output_files(&out);
            prop_assert_eq!(files.len(), 1);
            prop_assert_eq!(std::fs::read(&files[0]).unwrap(), shards.concat());
        }
    }
}

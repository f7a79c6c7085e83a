//! # Off-chain Store
//!
//! Local side of the sharded off-chain transfer: answers metadata requests
//! for local files and reassembles shards announced by a peer.
//!
//! Reassembly reads shards `1..=shard_size` from the announced directory in
//! order and appends them to a fresh file in the off-chain directory. An
//! existing file is never overwritten. A failed read or write aborts the
//! transfer and leaves the partial file in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use appchain_telemetry::BridgeMetrics;
use chrono::Local;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::domain::{
    ClientError, DataOutcome, OffChainDataInfo, OffChainDataRequest, OffChainDataResponse,
};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ClientError + '_ {
    move |source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Output name stem for a transfer. Path separators are replaced so the
/// file always lands directly in the off-chain directory.
fn output_stem(msg: &str) -> String {
    let stem: String = msg
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => "data".to_string(),
        _ => stem,
    }
}

/// Off-chain file store.
pub struct OffChainStore {
    dir: PathBuf,
    metrics: Arc<BridgeMetrics>,
}

impl OffChainStore {
    /// Store writing reassembled files under `dir`.
    pub fn new(dir: impl Into<PathBuf>, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            dir: dir.into(),
            metrics,
        }
    }

    /// Directory receiving reassembled files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stat the file a peer asked for.
    pub async fn info(&self, request: &OffChainDataRequest) -> Result<OffChainDataInfo, ClientError> {
        let filepath = String::from_utf8_lossy(&request.req).into_owned();
        let path = PathBuf::from(&filepath);
        let metadata = fs::metadata(&path).await.map_err(io_error(&path))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(path = %filepath, size = metadata.len(), "Serving off-chain data info");
        Ok(OffChainDataInfo {
            filename,
            filesize: metadata.len(),
            filepath,
        })
    }

    /// Reassemble the shards of a successful response.
    ///
    /// Returns the path of the written file. A failure response yields
    /// [`ClientError::OffChainDataFailure`] without touching the disk.
    pub async fn reassemble(&self, response: &OffChainDataResponse) -> Result<PathBuf, ClientError> {
        if response.outcome != DataOutcome::Success {
            return Err(ClientError::OffChainDataFailure {
                outcome: response.outcome.to_string(),
                message: response.msg.clone(),
            });
        }
        if response.shard_tag.shard_size == 0 {
            return Err(ClientError::Format(format!(
                "off-chain data {}-{}-{} has no shards",
                response.from, response.to, response.index
            )));
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;
        let shard_dir = PathBuf::from(String::from_utf8_lossy(&response.data).into_owned());
        let (path, mut file) = self.create_output(&response.msg).await?;

        for key in response.shard_keys() {
            let shard_path = shard_dir.join(key.file_name());
            let bytes = fs::read(&shard_path).await.map_err(io_error(&shard_path))?;
            file.write_all(&bytes).await.map_err(io_error(&path))?;
            self.metrics.record_shard();
            debug!(shard = key.shard, size = key.shard_size, bytes = bytes.len(), "Appended shard");
        }
        file.flush().await.map_err(io_error(&path))?;

        appchain_telemetry::log_ibtp_event!(
            info,
            "offchain",
            "Off-chain data reassembled",
            response.from,
            response.to,
            response.index,
            shards = response.shard_tag.shard_size,
            path = %path.display()
        );
        Ok(path)
    }

    /// Create `<msg>-<timestamp>`, adding a numeric suffix on collision.
    async fn create_output(&self, msg: &str) -> Result<(PathBuf, File), ClientError> {
        let base = format!(
            "{}-{}",
            output_stem(msg),
            Local::now().format("%Y.%m.%d-%H:%M:%S")
        );
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}.{attempt}")
            };
            let path = self.dir.join(name);
            match OpenOptions::new()
                .append(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    info!(path = %path.display(), "Created off-chain output file");
                    return Ok((path, file));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(io_error(&path)(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ShardKey, ShardTag};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store(dir: &Path) -> OffChainStore {
        OffChainStore::new(dir.join("out"), Arc::new(BridgeMetrics::new().unwrap()))
    }

    fn response(shard_dir: &Path, size: u64) -> OffChainDataResponse {
        OffChainDataResponse {
            outcome: DataOutcome::Success,
            msg: "blob".into(),
            from: "1356:eth1:0xa".into(),
            to: "1356:eth2:0xb".into(),
            index: 3,
            shard_tag: ShardTag {
                shard_index: 0,
                shard_size: size,
            },
            data: shard_dir.to_string_lossy().as_bytes().to_vec(),
        }
    }

    fn write_shards(dir: &Path, resp: &OffChainDataResponse, shards: &[Vec<u8>]) {
        for (key, bytes) in resp.shard_keys().zip(shards) {
            std::fs::write(dir.join(key.file_name()), bytes).unwrap();
        }
    }

    #[tokio::test]
    async fn test_shards_are_concatenated_in_order() {
        let tmp = TempDir::new().unwrap();
        let shards = vec![b"hello ".to_vec(), b"off-chain ".to_vec(), b"world".to_vec()];
        let resp = response(tmp.path(), 3);
        write_shards(tmp.path(), &resp, &shards);

        let store = store(tmp.path());
        let path = store.reassemble(&resp).await.unwrap();
        assert!(path.starts_with(store.dir()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("blob-"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello off-chain world");
        assert_eq!(store.metrics.shards(), 3);
    }

    #[tokio::test]
    async fn test_failure_outcome_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut resp = response(tmp.path(), 1);
        resp.outcome = DataOutcome::Failure;
        resp.msg = "disk full".into();

        let store = store(tmp.path());
        let err = store.reassemble(&resp).await.unwrap_err();
        assert_eq!(err.to_string(), "failure:disk full");
        assert!(!store.dir().exists());
    }

    #[tokio::test]
    async fn test_zero_shards_rejected_before_output() {
        let tmp = TempDir::new().unwrap();
        let resp = response(tmp.path(), 0);

        let store = store(tmp.path());
        let err = store.reassemble(&resp).await.unwrap_err();
        assert!(matches!(err, ClientError::Format(_)));
        assert!(!store.dir().exists());
        assert_eq!(store.metrics.shards(), 0);
    }

    #[tokio::test]
    async fn test_missing_shard_aborts_with_partial_file() {
        let tmp = TempDir::new().unwrap();
        let resp = response(tmp.path(), 3);
        write_shards(tmp.path(), &resp, &[b"one".to_vec()]);

        let store = store(tmp.path());
        let err = store.reassemble(&resp).await.unwrap_err();
        match err {
            ClientError::Io { path, .. } => {
                let expected = ShardKey {
                    from: resp.from.clone(),
                    to: resp.to.clone(),
                    index: 3,
                    shard: 2,
                    shard_size: 3,
                };
                assert_eq!(path, tmp.path().join(expected.file_name()));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let written: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(written.len(), 1);
        let partial = written[0].as_ref().unwrap().path();
        assert_eq!(std::fs::read(partial).unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_existing_output_is_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let resp = response(tmp.path(), 1);
        write_shards(tmp.path(), &resp, &[b"x".to_vec()]);
        let store = store(tmp.path());

        let first = store.reassemble(&resp).await.unwrap();
        let second = store.reassemble(&resp).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(first).unwrap(), b"x");
        assert_eq!(std::fs::read(second).unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_separator_in_message_stays_in_directory() {
        let tmp = TempDir::new().unwrap();
        let mut resp = response(tmp.path(), 1);
        resp.msg = "../escape".into();
        write_shards(tmp.path(), &resp, &[b"x".to_vec()]);

        let store = store(tmp.path());
        let path = store.reassemble(&resp).await.unwrap();
        assert_eq!(path.parent().unwrap(), store.dir());
    }

    #[tokio::test]
    async fn test_info_stats_requested_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("payload.bin");
        std::fs::write(&file, vec![0u8; 42]).unwrap();
        let filepath = file.to_string_lossy().into_owned();

        let store = store(tmp.path());
        let info = store
            .info(&OffChainDataRequest {
                index: 1,
                from: "1356:eth1:0xa".into(),
                to: "1356:eth2:0xb".into(),
                req: filepath.as_bytes().to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(info.filename, "payload.bin");
        assert_eq!(info.filesize, 42);
        assert_eq!(info.filepath, filepath);
    }

    #[tokio::test]
    async fn test_info_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        let err = store
            .info(&OffChainDataRequest {
                index: 1,
                from: String::new(),
                to: String::new(),
                req: b"/definitely/not/here".to_vec(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_reassembly_is_concatenation(
            shards in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..8)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let tmp = TempDir::new().unwrap();
            let resp = response(tmp.path(), shards.len() as u64);
            write_shards(tmp.path(), &resp, &shards);

            let store = store(tmp.path());
            let path = runtime.block_on(store.reassemble(&resp)).unwrap();
            prop_assert_eq!(std::fs::read(path).unwrap(), shards.concat());
        }
    }
}

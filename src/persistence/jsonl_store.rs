use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::Serialize;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use crate::error::{Error, Result};
use crate::interfaces::FundingStore;
use crate::types::{FundingQuote, FundingRecord, StakingSnapshot};

pub const FUNDING_RECORDS_FILE: &str = "funding_records.jsonl";
pub const STAKING_SNAPSHOTS_FILE: &str = "staking_snapshots.jsonl";

/// Append-only JSON-lines sink.
///
/// ## Layout
/// - `<dir>/funding_records.jsonl`: one [`FundingRecord`] per line
/// - `<dir>/staking_snapshots.jsonl`: one [`StakingSnapshot`] per line
///
/// The directory is created on first write. A record is serialized in full
/// before anything touches the file, then written with a single append while
/// holding the store lock, so concurrent writers never interleave lines.
pub struct JsonLinesStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        JsonLinesStore {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn funding_path(&self) -> PathBuf {
        self.dir.join(FUNDING_RECORDS_FILE)
    }

    pub fn staking_path(&self) -> PathBuf {
        self.dir.join(STAKING_SNAPSHOTS_FILE)
    }

    async fn append<T: Serialize>(&self, path: PathBuf, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| Error::SerializationError(e.to_string()))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        async_fs::create_dir_all(&self.dir).await?;

        let mut file = async_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::Persistence(format!("open {:?}: {}", path, e)))?;

        file.write_all(&line)
            .await
            .map_err(|e| Error::Persistence(format!("append {:?}: {}", path, e)))?;
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl FundingStore for JsonLinesStore {
    async fn insert_funding_record(&self, quote: &FundingQuote) -> Result<()> {
        self.append(self.funding_path(), &FundingRecord::from(quote)).await
    }

    async fn insert_staking_snapshot(&self, snapshot: &StakingSnapshot) -> Result<()> {
        self.append(self.staking_path(), snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::types::Timestamp;

    fn quote(symbol: &str, hourly: f64) -> FundingQuote {
        FundingQuote::new(
            symbol,
            "bybit",
            hourly,
            8.0,
            Some("2024-05-01T08:00:00.000Z".to_string()),
            Timestamp::from_millis(1_714_550_400_000),
        )
    }

    #[tokio::test]
    async fn test_creates_directory_and_appends_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonLinesStore::new(tmp.path().join("nested").join("data"));

        store.insert_funding_record(&quote("BTC", 0.01)).await.unwrap();
        store.insert_funding_record(&quote("ETH", -0.02)).await.unwrap();

        let content = tokio::fs::read_to_string(store.funding_path()).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: FundingRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.symbol, "BTC");
        assert_eq!(first.exchange, "bybit");
        assert_eq!(first.interval, 8.0);
        assert_eq!(first.next_funding, "2024-05-01T08:00:00.000Z");

        let second: FundingRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.rate, -0.02);
    }

    #[tokio::test]
    async fn test_staking_snapshots_go_to_their_own_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonLinesStore::new(tmp.path());
        let snapshot = StakingSnapshot {
            apy: 12.5,
            share_price: 1.04,
            timestamp: Timestamp::from_millis(7),
        };

        store.insert_staking_snapshot(&snapshot).await.unwrap();

        let content = tokio::fs::read_to_string(store.staking_path()).await.unwrap();
        let parsed: StakingSnapshot = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(parsed, snapshot);
        assert!(!store.funding_path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_writers_produce_whole_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonLinesStore::new(tmp.path()));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_funding_record(&quote(&format!("SYM{}", i), 0.001 * i as f64)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let content = tokio::fs::read_to_string(store.funding_path()).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            serde_json::from_str::<FundingRecord>(line).unwrap();
        }
    }
}

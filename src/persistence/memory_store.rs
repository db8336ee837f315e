use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::error::Result;
use crate::interfaces::FundingStore;
use crate::types::{FundingQuote, FundingRecord, StakingSnapshot};

/// In-process store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<FundingRecord>>,
    snapshots: RwLock<Vec<StakingSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn funding_records(&self) -> Vec<FundingRecord> {
        self.records.read().await.clone()
    }

    pub async fn staking_snapshots(&self) -> Vec<StakingSnapshot> {
        self.snapshots.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Waits until at least `count` funding records are stored.
    /// Returns false if `timeout` elapses first.
    pub async fn wait_for_records(&self, count: usize, timeout: Duration) -> bool {
        let poll = async {
            while self.len().await < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    pub async fn wait_for_snapshots(&self, count: usize, timeout: Duration) -> bool {
        let poll = async {
            while self.snapshots.read().await.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }
}

#[async_trait]
impl FundingStore for MemoryStore {
    async fn insert_funding_record(&self, quote: &FundingQuote) -> Result<()> {
        self.records.write().await.push(FundingRecord::from(quote));
        Ok(())
    }

    async fn insert_staking_snapshot(&self, snapshot: &StakingSnapshot) -> Result<()> {
        self.snapshots.write().await.push(snapshot.clone());
        Ok(())
    }
}

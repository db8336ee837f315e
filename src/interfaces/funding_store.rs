use crate::error::Result;
use crate::types::{FundingQuote, StakingSnapshot};
use async_trait::async_trait;

/// Append-only sink for normalized observations. Each call persists exactly
/// one record or fails without a partial write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundingStore: Send + Sync {
    async fn insert_funding_record(&self, quote: &FundingQuote) -> Result<()>;
    async fn insert_staking_snapshot(&self, snapshot: &StakingSnapshot) -> Result<()>;
}

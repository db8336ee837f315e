pub mod timestamp;
pub mod funding_rate;
pub mod opportunity;
pub mod staking;

pub use funding_rate::{FundingQuote, FundingRecord, RawFundingResponse};
pub use opportunity::{ArbitrageOpportunity, OpportunityKey};
pub use staking::StakingSnapshot;
pub use timestamp::Timestamp;

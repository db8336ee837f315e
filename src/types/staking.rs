use serde::{Deserialize, Serialize};
use crate::types::timestamp::Timestamp;

/// Staking pool APY and share price of the home venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakingSnapshot {
    pub apy: f64,
    pub share_price: f64,
    pub timestamp: Timestamp,
}

use serde::{Deserialize, Serialize};
use crate::types::funding_rate::FundingQuote;

/// A long/short venue pair for one symbol. Only the arbitrage detector builds these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub symbol: String,
    pub long_exchange: String,
    pub long_rate_hourly: f64,
    pub long_rate_yearly: f64,
    pub short_exchange: String,
    pub short_rate_hourly: f64,
    pub short_rate_yearly: f64,
    pub spread_hourly: f64,
    pub spread_yearly: f64,
}

impl ArbitrageOpportunity {
    pub(crate) fn from_legs(long: &FundingQuote, short: &FundingQuote) -> Self {
        ArbitrageOpportunity {
            symbol: long.symbol.clone(),
            long_exchange: long.exchange.clone(),
            long_rate_hourly: long.hourly_rate_pct(),
            long_rate_yearly: long.yearly_rate_pct(),
            short_exchange: short.exchange.clone(),
            short_rate_hourly: short.hourly_rate_pct(),
            short_rate_yearly: short.yearly_rate_pct(),
            spread_hourly: short.hourly_rate_pct() - long.hourly_rate_pct(),
            spread_yearly: short.yearly_rate_pct() - long.yearly_rate_pct(),
        }
    }

    pub fn key(&self) -> OpportunityKey {
        OpportunityKey {
            symbol: self.symbol.clone(),
            long_exchange: self.long_exchange.clone(),
            short_exchange: self.short_exchange.clone(),
        }
    }

    pub fn involves(&self, exchange: &str) -> bool {
        self.long_exchange.eq_ignore_ascii_case(exchange)
            || self.short_exchange.eq_ignore_ascii_case(exchange)
    }
}

/// Notification dedup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityKey {
    pub symbol: String,
    pub long_exchange: String,
    pub short_exchange: String,
}

impl OpportunityKey {
    pub fn new(
        symbol: impl Into<String>,
        long_exchange: impl Into<String>,
        short_exchange: impl Into<String>,
    ) -> Self {
        OpportunityKey {
            symbol: symbol.into(),
            long_exchange: long_exchange.into(),
            short_exchange: short_exchange.into(),
        }
    }
}

impl std::fmt::Display for OpportunityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}->{}", self.symbol, self.long_exchange, self.short_exchange)
    }
}

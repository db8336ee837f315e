use serde::{Deserialize, Serialize};
use crate::types::timestamp::Timestamp;
use crate::HOURS_PER_YEAR;

/// Funding-rate payload as returned by a connector, before normalization.
///
/// `funding_rate` is in the exchange's native scale (fraction or percent per
/// funding interval); `interval` is the exchange's textual interval, e.g. `"8h"`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawFundingResponse {
    pub funding_rate: Option<f64>,
    pub interval: Option<String>,
    pub funding_datetime: Option<String>,
    #[serde(default)]
    pub info: serde_json::Value,
}

/// One exchange's current funding observation for one symbol, in percent per hour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundingQuote {
    pub symbol: String,
    pub exchange: String,
    hourly_rate_pct: f64,
    pub interval_hours: f64,
    pub next_funding_time: Option<String>,
    pub observed_at: Timestamp,
}

impl FundingQuote {
    pub fn new(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        hourly_rate_pct: f64,
        interval_hours: f64,
        next_funding_time: Option<String>,
        observed_at: Timestamp,
    ) -> Self {
        FundingQuote {
            symbol: symbol.into(),
            exchange: exchange.into(),
            hourly_rate_pct,
            interval_hours,
            next_funding_time,
            observed_at,
        }
    }

    pub fn hourly_rate_pct(&self) -> f64 {
        self.hourly_rate_pct
    }

    /// Always derived from the hourly rate.
    pub fn yearly_rate_pct(&self) -> f64 {
        self.hourly_rate_pct * HOURS_PER_YEAR
    }

    /// A zero rate is a valid observation but carries no arbitrage signal.
    pub fn has_signal(&self) -> bool {
        self.hourly_rate_pct != 0.0
    }
}

/// Flat record handed to persistence sinks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingRecord {
    pub symbol: String,
    pub exchange: String,
    pub rate: f64,
    pub rate_1y: f64,
    pub next_funding: String,
    pub interval: f64,
    pub timestamp: Timestamp,
}

impl From<&FundingQuote> for FundingRecord {
    fn from(quote: &FundingQuote) -> Self {
        FundingRecord {
            symbol: quote.symbol.clone(),
            exchange: quote.exchange.clone(),
            rate: quote.hourly_rate_pct(),
            rate_1y: quote.yearly_rate_pct(),
            next_funding: quote
                .next_funding_time
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            interval: quote.interval_hours,
            timestamp: quote.observed_at,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Rate scale used when an exchange is not listed in [`SCALE_FACTORS`]:
/// the exchange reports a fraction of notional, so ×100 gives percent.
pub const DEFAULT_SCALE_FACTOR: f64 = 100.0;

/// Settlement currency used when an exchange is not listed in [`SETTLEMENTS`].
pub const DEFAULT_SETTLEMENT: &str = "USDT";

// Exchanges that already report funding in percent.
const SCALE_FACTORS: &[(&str, f64)] = &[
    ("reya", 1.0),
];

const SETTLEMENTS: &[(&str, &str)] = &[
    ("hyperliquid", "USDC"),
    ("reya", "RUSD"),
];

pub fn scale_factor_for(exchange: &str) -> f64 {
    SCALE_FACTORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(exchange))
        .map(|(_, factor)| *factor)
        .unwrap_or(DEFAULT_SCALE_FACTOR)
}

pub fn settlement_for(exchange: &str) -> &'static str {
    SETTLEMENTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(exchange))
        .map(|(_, quote)| *quote)
        .unwrap_or(DEFAULT_SETTLEMENT)
}

/// Strips any `/QUOTE:SETTLE` suffix: `"BTC/USDT:USDT"` → `"BTC"`.
pub fn base_symbol(symbol: &str) -> &str {
    symbol.split('/').next().unwrap_or(symbol).trim()
}

/// Per-exchange settings as they appear in configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExchangeConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub settlement: Option<String>,
    #[serde(default)]
    pub scale_factor: Option<f64>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl ExchangeConfig {
    pub fn named(name: &str) -> Self {
        ExchangeConfig {
            name: name.to_string(),
            enabled: true,
            settlement: None,
            scale_factor: None,
            base_url: None,
        }
    }
}

/// Immutable facts about an exchange the core needs for symbol translation
/// and rate normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct ExchangeDescriptor {
    pub name: String,
    pub settlement: String,
    pub scale_factor: f64,
}

impl ExchangeDescriptor {
    pub fn new(name: &str) -> Self {
        ExchangeDescriptor {
            name: name.to_string(),
            settlement: settlement_for(name).to_string(),
            scale_factor: scale_factor_for(name),
        }
    }

    pub fn from_config(config: &ExchangeConfig) -> Self {
        let mut descriptor = ExchangeDescriptor::new(&config.name);
        if let Some(settlement) = &config.settlement {
            descriptor.settlement = settlement.to_uppercase();
        }
        if let Some(factor) = config.scale_factor {
            descriptor.scale_factor = factor;
        }
        descriptor
    }

    /// Unified market symbol for a canonical base asset on this exchange.
    pub fn market_symbol(&self, base: &str) -> String {
        format!("{}/{}:{}", base, self.settlement, self.settlement)
    }
}

pub mod types;
pub mod config;
pub mod connectors;
pub mod interfaces;
pub mod funding;
pub mod arbitrage;
pub mod persistence;
pub mod notify;
pub mod core;
pub mod observability;
pub mod api;
pub mod utils;
pub mod error;

// Annualization factor for hourly rates (24 * 365)
pub const HOURS_PER_YEAR: f64 = 8760.0;

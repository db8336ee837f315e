pub mod normalizer;
pub mod fetcher;

pub use fetcher::{FetchPolicy, FundingFetcher};
pub use normalizer::{normalize, parse_interval_hours, DEFAULT_INTERVAL_HOURS};

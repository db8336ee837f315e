pub mod funding_store;
pub mod notifier;

pub use funding_store::FundingStore;
pub use notifier::Notifier;

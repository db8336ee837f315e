pub mod detector;
pub mod gatekeeper;

pub use detector::{ArbitrageDetector, Detection, OpportunityFilter};
pub use gatekeeper::NotificationGatekeeper;

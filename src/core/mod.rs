pub mod poller;
pub mod state_machine;
pub mod summary;

pub use poller::{CycleReport, FundingPoller, HomeVenue, PollSchedule};
pub use state_machine::{CycleState, StateMachine};
pub use summary::SummaryReporter;

//! Persistence: baselines and run reports (atomically published, one
//! prior generation kept), the pending-alert ledger and the interaction
//! history log.

pub mod baseline;
pub mod history;

pub use baseline::{BASELINE_VERSION, Baseline, BaselineStore, FileBaselineStore, entry_key};
pub use history::InteractionLog;

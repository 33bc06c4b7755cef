use std::fmt;

use serde::{Deserialize, Serialize};

/// Scheduler state machine.
///
/// `Idle -> Discovering -> Selecting -> Interacting -> Recovering ->
/// (Discovering | Complete)`; any state moves to `Error` when the session dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorerState {
    Idle,
    Discovering,
    Selecting,
    Interacting,
    Recovering,
    Complete,
    Error,
}

impl ExplorerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExplorerState::Complete | ExplorerState::Error)
    }
}

/// Why a cycle stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// No unvisited element is reachable
    Exhausted,
    StepBudget,
    TimeBudget,
    Cancelled,
    Failed { message: String },
}

impl Termination {
    /// Cycles ending this way produce a baseline.
    pub fn completed(&self) -> bool {
        matches!(
            self,
            Termination::Exhausted | Termination::StepBudget | Termination::TimeBudget
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => f.write_str("exhausted"),
            Termination::StepBudget => f.write_str("step budget"),
            Termination::TimeBudget => f.write_str("time budget"),
            Termination::Cancelled => f.write_str("cancelled"),
            Termination::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

use std::time::{Duration, Instant};

use super::config::ExploreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    Allow,
    Block(&'static str),
}

/// Step and wall-clock budgets of one cycle.
#[derive(Debug, Clone)]
pub struct CycleBudget {
    steps_remaining: u32,
    steps_used: u32,
    started: Instant,
    time_limit: Duration,
}

impl CycleBudget {
    pub fn new(config: &ExploreConfig) -> Self {
        Self {
            steps_remaining: config.step_budget,
            steps_used: 0,
            started: Instant::now(),
            time_limit: Duration::from_secs(config.time_budget_secs),
        }
    }

    /// Whether another interaction attempt may start.
    pub fn check(&self) -> BudgetDecision {
        // ---- Wall clock ----
        if self.time_exhausted() {
            return BudgetDecision::Block("time_budget_exhausted");
        }

        // ---- Steps ----
        if self.steps_remaining == 0 {
            return BudgetDecision::Block("step_budget_exhausted");
        }

        BudgetDecision::Allow
    }

    pub fn time_exhausted(&self) -> bool {
        self.started.elapsed() >= self.time_limit
    }

    /// Count one interaction attempt.
    pub fn consume_step(&mut self) {
        self.steps_remaining = self.steps_remaining.saturating_sub(1);
        self.steps_used += 1;
    }

    pub fn steps_used(&self) -> u32 {
        self.steps_used
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

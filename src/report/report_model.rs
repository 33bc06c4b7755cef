use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::explorer::{CycleResult, Termination};
use crate::outcome::Outcome;
use crate::regression::{DedupeOutcome, Issue, IssueKind, Severity};

// ============================================================================
// Run report: one per exploration cycle
// ============================================================================

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub p0: usize,
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
}

impl SeverityCounts {
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::P0 => counts.p0 += 1,
                Severity::P1 => counts.p1 += 1,
                Severity::P2 => counts.p2 += 1,
                Severity::P3 => counts.p3 += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.p0 + self.p1 + self.p2 + self.p3
    }
}

/// Summary of one cycle, persisted next to the baseline and printed by the CLI.
///
/// Built with `from_cycle()` for cycles that ran, or `session_failed()` when
/// no session could be opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub entry_url: String,
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub termination: Termination,

    /// False when the cycle never reached the application
    pub session_opened: bool,

    pub screens: usize,
    pub transitions: usize,
    pub elements_total: usize,
    pub elements_visited: usize,
    pub coverage_percent: f64,
    pub full_coverage: bool,

    pub steps_used: u32,
    pub interactions: usize,
    pub errors: usize,
    pub crashes: usize,

    pub issues_by_severity: SeverityCounts,
    pub regressions: usize,
    pub new_screens: usize,
    pub possible_removals: usize,

    pub alerts_sent: usize,
    pub alerts_suppressed: usize,

    /// Whether this cycle became the new baseline
    pub baseline_saved: bool,

    /// Issues that were alerted this cycle
    #[serde(default)]
    pub alerted: Vec<Issue>,

    /// Seconds since the coordinator started, at the end of this cycle
    #[serde(default)]
    pub uptime_secs: u64,
}

impl RunReport {
    pub fn from_cycle(
        entry_url: &str,
        result: &CycleResult,
        deduped: &DedupeOutcome,
        alerts_sent: usize,
    ) -> Self {
        let stats = result.stats();
        let all: Vec<&Issue> = deduped.alert.iter().chain(deduped.suppressed.iter()).collect();
        let count_kind = |kind: IssueKind| all.iter().filter(|i| i.kind == kind).count();
        let count_outcome = |outcome: Outcome| result.records.iter().filter(|r| r.outcome == outcome).count();

        Self {
            run_id: result.run_id.clone(),
            entry_url: entry_url.to_string(),
            cycle: result.cycle,
            started_at: result.started_at,
            ended_at: result.ended_at,
            termination: result.termination.clone(),
            session_opened: true,
            screens: stats.screens,
            transitions: stats.transitions,
            elements_total: stats.elements_total,
            elements_visited: stats.elements_visited(),
            coverage_percent: stats.coverage_percent(),
            full_coverage: result.full_coverage(),
            steps_used: result.steps_used,
            interactions: result.records.len(),
            errors: count_outcome(Outcome::Error),
            crashes: count_outcome(Outcome::Crash),
            issues_by_severity: SeverityCounts::from_issues(all.iter().copied()),
            regressions: count_kind(IssueKind::Regression),
            new_screens: count_kind(IssueKind::NewScreen),
            possible_removals: count_kind(IssueKind::PossibleRemoval),
            alerts_sent,
            alerts_suppressed: deduped.suppressed.len(),
            baseline_saved: false,
            alerted: deduped.alert.clone(),
            uptime_secs: 0,
        }
    }

    /// Report for a cycle whose session could not be opened.
    pub fn session_failed(entry_url: &str, run_id: &str, cycle: u64, message: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            entry_url: entry_url.to_string(),
            cycle,
            started_at: now,
            ended_at: now,
            termination: Termination::Failed {
                message: message.to_string(),
            },
            session_opened: false,
            screens: 0,
            transitions: 0,
            elements_total: 0,
            elements_visited: 0,
            coverage_percent: 0.0,
            full_coverage: false,
            steps_used: 0,
            interactions: 0,
            errors: 0,
            crashes: 0,
            issues_by_severity: SeverityCounts::default(),
            regressions: 0,
            new_screens: 0,
            possible_removals: 0,
            alerts_sent: 0,
            alerts_suppressed: 0,
            baseline_saved: false,
            alerted: Vec::new(),
            uptime_secs: 0,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    pub fn succeeded(&self) -> bool {
        self.termination.completed()
    }

    /// Severity of the cycle-summary notification: more than five errors is
    /// P1, any error P2, a clean cycle P3. Crashes count as errors.
    pub fn summary_severity(&self) -> Severity {
        match self.errors + self.crashes {
            0 => Severity::P3,
            1..=5 => Severity::P2,
            _ => Severity::P1,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collab::{Action, Diagnosis};
use crate::identity::ScreenSignature;
use crate::outcome::Outcome;
use crate::sitemap::{CoverageStats, DiscoveryStatus, ElementKey, ElementKind, SiteMap};

use super::state::Termination;

/// Immutable log entry for one interaction attempt.
///
/// Built only after the outcome is classified, so a record is never
/// observed half-written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub run_id: String,
    pub cycle: u64,

    /// Position within the cycle, starting at 1
    pub seq: u64,

    pub screen: ScreenSignature,
    pub raw_url: String,

    pub element: ElementKey,
    pub element_label: String,
    pub element_kind: ElementKind,

    /// Every action dispatched for this attempt, in order
    pub actions: Vec<Action>,

    pub outcome: Outcome,
    #[serde(default)]
    pub http_status: Option<u16>,

    /// URL of the view after the interaction settled
    #[serde(default)]
    pub landed_url: Option<String>,

    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,

    #[serde(default)]
    pub diagnosis: Option<Diagnosis>,
}

/// What one exploration cycle produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub run_id: String,
    pub cycle: u64,
    pub site_map: SiteMap,
    pub records: Vec<InteractionRecord>,
    pub termination: Termination,
    pub steps_used: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl CycleResult {
    pub fn stats(&self) -> CoverageStats {
        self.site_map.coverage_stats()
    }

    /// Every screen was fully discovered and every element dealt with
    /// before the cycle ran dry.
    pub fn full_coverage(&self) -> bool {
        self.termination == Termination::Exhausted
            && self.stats().unvisited == 0
            && self
                .site_map
                .screens
                .iter()
                .all(|s| s.discovery == DiscoveryStatus::Complete)
    }
}

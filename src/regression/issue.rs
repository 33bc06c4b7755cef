use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{IdentityConfig, ScreenSignature};
use crate::outcome::Outcome;
use crate::sitemap::ElementKey;

/// Root-cause category of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    UxFriction,
    TechnicalError,
    Accessibility,
    Performance,
    BrokenFlow,
    FormValidation,
    Navigation,
    Content,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCategory::UxFriction => "UX_FRICTION",
            IssueCategory::TechnicalError => "TECHNICAL_ERROR",
            IssueCategory::Accessibility => "ACCESSIBILITY",
            IssueCategory::Performance => "PERFORMANCE",
            IssueCategory::BrokenFlow => "BROKEN_FLOW",
            IssueCategory::FormValidation => "FORM_VALIDATION",
            IssueCategory::Navigation => "NAVIGATION",
            IssueCategory::Content => "CONTENT",
        };
        f.write_str(s)
    }
}

/// Severity, most severe first (`P0 < P3` in ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Blocker
    P0,
    P1,
    P2,
    /// Minor or cosmetic
    P3,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::P0 => "P0 - Critical",
            Severity::P1 => "P1 - High",
            Severity::P2 => "P2 - Medium",
            Severity::P3 => "P3 - Low",
        }
    }

    /// The more severe of the two.
    pub fn at_least(self, floor: Severity) -> Severity {
        self.min(floor)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Interaction ended in error or crash
    Failure,
    /// Element worked in the previous baseline and fails now
    Regression,
    NewScreen,
    /// Screen from the previous baseline not seen in a full-coverage cycle
    PossibleRemoval,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::Failure => "failure",
            IssueKind::Regression => "regression",
            IssueKind::NewScreen => "new screen",
            IssueKind::PossibleRemoval => "possible removal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub category: IssueCategory,
    pub severity: Severity,
    pub screen: ScreenSignature,

    /// Absent for screen-level issues
    #[serde(default)]
    pub element: Option<ElementKey>,

    /// Element label as reported by the oracle
    #[serde(default)]
    pub element_label: Option<String>,

    #[serde(default)]
    pub outcome: Option<Outcome>,

    pub description: String,
    #[serde(default)]
    pub suggested_fix: Option<String>,

    pub cycle: u64,
    pub detected_at: DateTime<Utc>,
}

impl Issue {
    /// Dedupe identity: `(category, screen, element)`.
    pub fn same_identity(&self, other: &Issue, config: &IdentityConfig) -> bool {
        if self.category != other.category {
            return false;
        }
        if !self.screen.matches(&other.screen, config.similarity_threshold) {
            return false;
        }
        match (&self.element, &other.element) {
            (Some(a), Some(b)) => a.matches(b, config.region_iou),
            (None, None) => true,
            _ => false,
        }
    }

    /// One-line summary for logs and alert text.
    pub fn headline(&self) -> String {
        let target = self
            .element_label
            .as_deref()
            .map(|l| format!("'{}' on {}", l, self.screen.url))
            .unwrap_or_else(|| self.screen.url.clone());
        format!("[{}] {} {}: {}", self.severity, self.kind, self.category, target)
    }
}

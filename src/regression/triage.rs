use crate::collab::{Diagnosis, DiagnosisContext, DiagnosisOracle, View};
use crate::error::Result;
use crate::outcome::Outcome;

use super::issue::{IssueCategory, IssueKind, Severity};

// ============================================================================
// Keyword categorization
// ============================================================================

/// Keyword table, checked in order; the category with most hits wins and
/// earlier rows win ties.
const CATEGORY_KEYWORDS: &[(IssueCategory, &[&str])] = &[
    (
        IssueCategory::TechnicalError,
        &[
            "error", "crash", "500", "404", "timeout", "failed", "broken", "not working",
            "exception",
        ],
    ),
    (
        IssueCategory::BrokenFlow,
        &["stuck", "cannot proceed", "blocked", "dead end", "missing step", "unresponsive"],
    ),
    (
        IssueCategory::FormValidation,
        &["invalid input", "validation", "required field", "format", "password requirements"],
    ),
    (
        IssueCategory::Performance,
        &["slow", "loading", "lag", "frozen", "spinner", "taking too long"],
    ),
    (
        IssueCategory::Navigation,
        &["can't navigate", "back button", "navigation", "menu", "lost"],
    ),
    (
        IssueCategory::Accessibility,
        &["small text", "hard to read", "low contrast", "tiny button", "too small"],
    ),
    (
        IssueCategory::UxFriction,
        &["confusing", "unclear", "hard to find", "not obvious", "hidden", "difficult"],
    ),
    (
        IssueCategory::Content,
        &["missing information", "no help", "unclear instructions", "explanation"],
    ),
];

/// Categorize a free-text description by keyword hits. Falls back to
/// `TechnicalError`, the category of every interaction failure.
pub fn categorize(description: &str) -> IssueCategory {
    let text = description.to_lowercase();
    let mut best = (IssueCategory::TechnicalError, 0usize);

    for (category, keywords) in CATEGORY_KEYWORDS {
        let hits = keywords.iter().filter(|k| text.contains(*k)).count();
        if hits > best.1 {
            best = (*category, hits);
        }
    }
    best.0
}

// ============================================================================
// Severity scoring
// ============================================================================

/// Rule-based severity:
/// crash -> P0; regression at least P1; 5xx -> P1; other failures -> P2;
/// possible removal -> P2; new screen -> P3.
pub fn score_severity(
    kind: IssueKind,
    outcome: Option<Outcome>,
    category: IssueCategory,
    http_status: Option<u16>,
) -> Severity {
    let base = match (kind, outcome) {
        (IssueKind::NewScreen, _) => return Severity::P3,
        (IssueKind::PossibleRemoval, _) => return Severity::P2,
        (_, Some(Outcome::Crash)) => Severity::P0,
        _ if http_status.is_some_and(|s| s >= 500) => Severity::P1,
        _ if category == IssueCategory::BrokenFlow => Severity::P1,
        _ => Severity::P2,
    };

    if kind == IssueKind::Regression {
        base.at_least(Severity::P1)
    } else {
        base
    }
}

// ============================================================================
// RuleBasedDiagnosis: fallback when no diagnosis oracle answers
// ============================================================================

/// Deterministic diagnosis from the interaction context alone.
pub struct RuleBasedDiagnosis;

impl RuleBasedDiagnosis {
    pub fn diagnose_context(context: &DiagnosisContext) -> Diagnosis {
        let description = context.describe();
        let category = categorize(&description);
        let severity = score_severity(
            IssueKind::Failure,
            Some(context.outcome),
            category,
            context.http_status,
        );

        let suggested_fix = match (context.outcome, context.http_status) {
            (Outcome::Crash, _) => "Check the browser console for the render exception".to_string(),
            (_, Some(s)) if s >= 500 => format!("Inspect server logs for the HTTP {} response", s),
            (_, Some(s)) => format!("Verify the request triggered by this element (HTTP {})", s),
            _ => "Reproduce the interaction and inspect the resulting view".to_string(),
        };

        Diagnosis {
            category,
            severity,
            description,
            suggested_fix: Some(suggested_fix),
        }
    }
}

impl DiagnosisOracle for RuleBasedDiagnosis {
    fn diagnose(&self, _view: &View, context: &DiagnosisContext) -> Result<Diagnosis> {
        Ok(Self::diagnose_context(context))
    }
}

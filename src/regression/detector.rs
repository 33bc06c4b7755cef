use chrono::Utc;
use tracing::{debug, info};

use crate::collab::DiagnosisContext;
use crate::explorer::{CycleResult, InteractionRecord};
use crate::identity::IdentityConfig;
use crate::outcome::Outcome;
use crate::sitemap::{Element, Screen, SiteMap, VisitState};
use crate::store::Baseline;

use super::issue::{Issue, IssueCategory, IssueKind, Severity};
use super::triage::{RuleBasedDiagnosis, score_severity};

/// One `Failure` issue per interaction record that ended in error or crash.
///
/// Records without a diagnosis payload are triaged by rule.
pub fn issues_from_records(records: &[InteractionRecord], cycle: u64) -> Vec<Issue> {
    records
        .iter()
        .filter(|r| r.outcome.is_failure())
        .map(|r| {
            let diagnosis = r.diagnosis.clone().unwrap_or_else(|| {
                RuleBasedDiagnosis::diagnose_context(&DiagnosisContext {
                    url: r.raw_url.clone(),
                    element_label: r.element_label.clone(),
                    outcome: r.outcome,
                    http_status: r.http_status,
                })
            });
            Issue {
                kind: IssueKind::Failure,
                category: diagnosis.category,
                severity: diagnosis.severity,
                screen: r.screen.clone(),
                element: Some(r.element.clone()),
                element_label: Some(r.element_label.clone()),
                outcome: Some(r.outcome),
                description: diagnosis.description,
                suggested_fix: diagnosis.suggested_fix,
                cycle,
                detected_at: r.started_at,
            }
        })
        .collect()
}

/// Full issue set of a cycle: its failures, plus regressions, new screens
/// and possible removals relative to the previous baseline.
///
/// Without a baseline only failures are reported.
pub fn detect(previous: Option<&Baseline>, current: &CycleResult, config: &IdentityConfig) -> Vec<Issue> {
    let failures = issues_from_records(&current.records, current.cycle);
    compare(
        previous,
        &current.site_map,
        current.full_coverage(),
        current.cycle,
        failures,
        config,
    )
}

/// Diff a site map against the previous baseline, starting from the
/// cycle's failure issues.
///
/// - an element `VisitedOk` in the baseline and `VisitedError` now is a
///   regression; its failure issue is upgraded in place (at least P1)
/// - a screen absent from the baseline is a new screen
/// - a baseline screen not seen now is a possible removal, reported only
///   when the current cycle reached full coverage
pub fn compare(
    previous: Option<&Baseline>,
    current: &SiteMap,
    full_coverage: bool,
    cycle: u64,
    failures: Vec<Issue>,
    config: &IdentityConfig,
) -> Vec<Issue> {
    let mut issues = failures;
    let Some(previous) = previous else {
        debug!(cycle, failures = issues.len(), "no baseline, skipping diff");
        return issues;
    };

    let before = &previous.site_map;
    let after = current;

    for screen in &before.screens {
        for element in screen.elements.iter().filter(|e| e.visit == VisitState::VisitedOk) {
            let Some(now) = after.locate(
                &screen.signature,
                &element.key(),
                config.similarity_threshold,
                config.region_iou,
            ) else {
                continue;
            };
            if now.visit != VisitState::VisitedError {
                continue;
            }
            flag_regression(&mut issues, screen, element, now, cycle, config);
        }
    }

    for screen in missing_screens(after, before, config.similarity_threshold) {
        issues.push(screen_issue(IssueKind::NewScreen, IssueCategory::Navigation, screen, cycle));
    }

    if full_coverage {
        for screen in missing_screens(before, after, config.similarity_threshold) {
            issues.push(screen_issue(IssueKind::PossibleRemoval, IssueCategory::BrokenFlow, screen, cycle));
        }
    }

    let regressions = issues.iter().filter(|i| i.kind == IssueKind::Regression).count();
    info!(cycle, issues = issues.len(), regressions, "regression detection finished");
    issues
}

/// Failure issues recovered from a persisted issue set, regressions
/// turned back into the failures they were derived from.
pub fn failures_of(issues: &[Issue]) -> Vec<Issue> {
    issues
        .iter()
        .filter(|i| i.outcome.is_some_and(|o| o.is_failure()))
        .filter(|i| matches!(i.kind, IssueKind::Failure | IssueKind::Regression))
        .map(|i| {
            let mut failure = i.clone();
            if failure.kind == IssueKind::Regression {
                failure.kind = IssueKind::Failure;
                if let Some(rest) = failure.description.strip_prefix(REGRESSION_PREFIX) {
                    failure.description = rest.to_string();
                }
            }
            failure
        })
        .collect()
}

const REGRESSION_PREFIX: &str = "Regression: ";

fn flag_regression(
    issues: &mut Vec<Issue>,
    screen: &Screen,
    before: &Element,
    now: &Element,
    cycle: u64,
    config: &IdentityConfig,
) {
    let key = before.key();
    let existing = issues.iter_mut().find(|i| {
        i.kind == IssueKind::Failure
            && i.screen.matches(&screen.signature, config.similarity_threshold)
            && i.element.as_ref().is_some_and(|k| k.matches(&key, config.region_iou))
    });

    match existing {
        Some(issue) => {
            issue.kind = IssueKind::Regression;
            issue.severity = issue.severity.at_least(Severity::P1);
            issue.description = format!("{}{}", REGRESSION_PREFIX, issue.description);
        }
        None => {
            // Escalated without a failing record, e.g. now unresponsive
            let outcome = now.last_outcome.unwrap_or(Outcome::NoChange);
            let category = IssueCategory::BrokenFlow;
            issues.push(Issue {
                kind: IssueKind::Regression,
                category,
                severity: score_severity(IssueKind::Regression, Some(outcome), category, None),
                screen: screen.signature.clone(),
                element: Some(key),
                element_label: Some(now.label.clone()),
                outcome: Some(outcome),
                description: format!(
                    "{}'{}' on {} worked in the previous cycle and is now {}",
                    REGRESSION_PREFIX,
                    now.label,
                    screen.signature.url,
                    now.note.as_deref().unwrap_or("failing")
                ),
                suggested_fix: None,
                cycle,
                detected_at: Utc::now(),
            });
        }
    }
}

fn screen_issue(kind: IssueKind, category: IssueCategory, screen: &Screen, cycle: u64) -> Issue {
    let description = match kind {
        IssueKind::NewScreen => format!("New screen discovered at {}", screen.raw_url),
        _ => format!(
            "Screen at {} from the previous baseline was not reached in a full-coverage cycle",
            screen.raw_url
        ),
    };
    Issue {
        kind,
        category,
        severity: score_severity(kind, None, category, None),
        screen: screen.signature.clone(),
        element: None,
        element_label: None,
        outcome: None,
        description,
        suggested_fix: None,
        cycle,
        detected_at: Utc::now(),
    }
}

/// Screens of `map` matching none in `other`.
pub fn missing_screens<'a>(map: &'a SiteMap, other: &SiteMap, threshold: f32) -> Vec<&'a Screen> {
    map.screens
        .iter()
        .filter(|s| other.find_screen(&s.signature, threshold).is_none())
        .collect()
}

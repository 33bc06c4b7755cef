use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collab::SideSignals;
use crate::identity::ScreenKey;
use crate::sitemap::VisitState;

/// What an interaction produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Navigated,
    NoChange,
    Error,
    Crash,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Error | Outcome::Crash)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Navigated => "navigated",
            Outcome::NoChange => "no_change",
            Outcome::Error => "error",
            Outcome::Crash => "crash",
        };
        f.write_str(s)
    }
}

/// Label an interaction from its before/after keys and side-channel signals.
///
/// Priority order:
/// 1. crash indicator (render exception or blank page) -> `Crash`
/// 2. HTTP 4xx/5xx in the action's window, or an oracle-reported visual error -> `Error`
/// 3. `after` is not the same screen as `before` -> `Navigated`
/// 4. otherwise -> `NoChange`
///
/// An `Unknown` key never equals anything, so callers handle unidentifiable
/// captures before classifying.
pub fn classify(
    before: &ScreenKey,
    after: &ScreenKey,
    signals: &SideSignals,
    similarity_threshold: f32,
) -> Outcome {
    if signals.crashed() {
        return Outcome::Crash;
    }
    if signals.http_error() || signals.visual_error {
        return Outcome::Error;
    }
    if !before.same_screen(after, similarity_threshold) {
        return Outcome::Navigated;
    }
    Outcome::NoChange
}

/// How an element's visit state changes after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitDecision {
    Mark(VisitState, Option<&'static str>),
    /// Leave the element unvisited and try it again
    Retry,
}

/// Map an outcome to a visit state. `NoChange` escalates to
/// `VisitedError` ("unresponsive") once `attempts` reaches `unresponsive_after`.
pub fn visit_decision(outcome: Outcome, attempts: u32, unresponsive_after: u32) -> VisitDecision {
    match outcome {
        Outcome::Navigated => VisitDecision::Mark(VisitState::VisitedOk, None),
        Outcome::Error => VisitDecision::Mark(VisitState::VisitedError, None),
        Outcome::Crash => VisitDecision::Mark(VisitState::VisitedError, Some("crash")),
        Outcome::NoChange if attempts >= unresponsive_after.max(1) => {
            VisitDecision::Mark(VisitState::VisitedError, Some("unresponsive"))
        }
        Outcome::NoChange => VisitDecision::Retry,
    }
}

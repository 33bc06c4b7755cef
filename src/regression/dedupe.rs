use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::IdentityConfig;

use super::issue::Issue;

/// Issues split into those to notify and those already reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupeOutcome {
    pub alert: Vec<Issue>,
    pub suppressed: Vec<Issue>,
}

/// Suppress issues already reported in the preceding cycle.
///
/// An issue is suppressed when `previous` holds one with the same identity
/// `(category, screen, element)` and the same outcome; a changed outcome or
/// category alerts again. Repeats within `current` collapse onto their
/// first occurrence.
pub fn dedupe(previous: &[Issue], current: Vec<Issue>, config: &IdentityConfig) -> DedupeOutcome {
    let mut result = DedupeOutcome::default();

    for issue in current {
        let seen_before = previous.iter().any(|p| repeats(p, &issue, config));
        let seen_now = result
            .alert
            .iter()
            .chain(result.suppressed.iter())
            .any(|p| repeats(p, &issue, config));

        if seen_now {
            debug!(issue = %issue.headline(), "duplicate within cycle dropped");
        } else if seen_before {
            debug!(issue = %issue.headline(), "already reported, suppressed");
            result.suppressed.push(issue);
        } else {
            result.alert.push(issue);
        }
    }
    result
}

fn repeats(earlier: &Issue, issue: &Issue, config: &IdentityConfig) -> bool {
    earlier.outcome == issue.outcome && earlier.same_identity(issue, config)
}

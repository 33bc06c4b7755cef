pub mod dedupe;
pub mod detector;
pub mod issue;
pub mod triage;

pub use dedupe::{DedupeOutcome, dedupe};
pub use detector::{compare, detect, failures_of, issues_from_records};
pub use issue::{Issue, IssueCategory, IssueKind, Severity};
pub use triage::{RuleBasedDiagnosis, categorize, score_severity};

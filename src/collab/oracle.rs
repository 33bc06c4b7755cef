use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::outcome::Outcome;
use crate::regression::{IssueCategory, Severity};
use crate::sitemap::{ElementKind, Priority, Region};

use super::session::View;

/// One interactive element as reported by the vision oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementCandidate {
    pub label: String,
    pub kind: ElementKind,
    pub region: Region,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    /// Element belongs to a modal/overlay covering the page
    #[serde(default)]
    pub in_overlay: bool,
}

impl ElementCandidate {
    pub fn new(label: &str, kind: ElementKind, region: Region) -> Self {
        Self {
            label: label.to_string(),
            kind,
            region,
            priority: Priority::default(),
            input_type: None,
            target_url: None,
            in_overlay: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_input_type(mut self, input_type: &str) -> Self {
        self.input_type = Some(input_type.to_string());
        self
    }

    pub fn with_target(mut self, url: &str) -> Self {
        self.target_url = Some(url.to_string());
        self
    }

    pub fn in_overlay(mut self) -> Self {
        self.in_overlay = true;
        self
    }
}

/// Vision oracle: turns a view into interactive elements.
///
/// Implementations bound their own latency (retries included) and report
/// `ExplorerError::OracleTimeout` instead of hanging.
pub trait ElementDiscovery {
    fn discover(&self, view: &View) -> Result<Vec<ElementCandidate>>;

    /// Whether the view visibly shows an error message.
    fn visual_error(&self, _view: &View) -> Result<bool> {
        Ok(false)
    }
}

/// What the explorer knows about a failing interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisContext {
    pub url: String,
    pub element_label: String,
    pub outcome: Outcome,
    pub http_status: Option<u16>,
}

impl DiagnosisContext {
    pub fn describe(&self) -> String {
        let status = self
            .http_status
            .map(|s| format!(" (HTTP {})", s))
            .unwrap_or_default();
        format!(
            "'{}' on {} ended in {}{}",
            self.element_label, self.url, self.outcome, status
        )
    }
}

/// Root-cause categorization of a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub category: IssueCategory,
    pub severity: Severity,
    pub description: String,
    pub suggested_fix: Option<String>,
}

pub trait DiagnosisOracle {
    fn diagnose(&self, view: &View, context: &DiagnosisContext) -> Result<Diagnosis>;
}

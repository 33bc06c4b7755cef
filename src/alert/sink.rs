use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

use crate::error::{ExplorerError, Result};
use crate::regression::{Issue, Severity};
use crate::report::RunReport;

/// Destination for deduplicated issues and cycle summaries. Called from the
/// dispatcher thread, never from the explorer.
pub trait AlertSink: Send {
    fn notify(&self, issue: &Issue) -> Result<()>;

    fn notify_summary(&self, report: &RunReport) -> Result<()>;
}

/// Writes alerts to the log only; the fallback when no webhook is configured.
pub struct LogSink;

impl AlertSink for LogSink {
    fn notify(&self, issue: &Issue) -> Result<()> {
        info!(
            severity = %issue.severity,
            kind = %issue.kind,
            category = %issue.category,
            url = %issue.screen.url,
            "ALERT {}",
            issue.description
        );
        Ok(())
    }

    fn notify_summary(&self, report: &RunReport) -> Result<()> {
        info!(
            severity = %report.summary_severity(),
            cycle = report.cycle,
            screens = report.screens,
            coverage = report.coverage_percent,
            errors = report.errors + report.crashes,
            "CYCLE {}",
            report.termination
        );
        Ok(())
    }
}

// ============================================================================
// HTTP sinks
// ============================================================================

/// Validated webhook URL plus the client posting to it.
struct HttpTarget {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpTarget {
    fn new(url: &str) -> Result<Self> {
        Url::parse(url).map_err(|e| ExplorerError::Alert(format!("invalid webhook URL '{}': {}", url, e)))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    fn post(&self, payload: &impl Serialize) -> Result<()> {
        let response = self.client.post(&self.url).json(payload).send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "webhook rejected alert");
            return Err(ExplorerError::Alert(format!(
                "webhook answered HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    text: String,
}

/// Slack-compatible incoming webhook (`{"text": ...}`).
pub struct WebhookSink {
    target: HttpTarget,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            target: HttpTarget::new(url)?,
        })
    }
}

impl AlertSink for WebhookSink {
    fn notify(&self, issue: &Issue) -> Result<()> {
        self.target.post(&WebhookPayload {
            text: format_alert(issue),
        })
    }

    fn notify_summary(&self, report: &RunReport) -> Result<()> {
        self.target.post(&WebhookPayload {
            text: format_summary(report),
        })
    }
}

/// Microsoft Teams incoming webhook, posting Adaptive Cards.
pub struct TeamsSink {
    target: HttpTarget,
}

impl TeamsSink {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            target: HttpTarget::new(url)?,
        })
    }
}

impl AlertSink for TeamsSink {
    fn notify(&self, issue: &Issue) -> Result<()> {
        self.target.post(&issue_card(issue))
    }

    fn notify_summary(&self, report: &RunReport) -> Result<()> {
        self.target.post(&summary_card(report))
    }
}

// ============================================================================
// Message bodies
// ============================================================================

fn severity_word(severity: Severity) -> &'static str {
    match severity {
        Severity::P0 => "CRITICAL",
        Severity::P1 => "HIGH",
        Severity::P2 => "MEDIUM",
        Severity::P3 => "LOW",
    }
}

/// Plain-text alert body.
pub fn format_alert(issue: &Issue) -> String {
    let mut text = format!(
        "[{} {}] {} ({})\n{}\nScreen: {}",
        issue.severity,
        severity_word(issue.severity),
        issue.kind,
        issue.category,
        issue.description,
        issue.screen.url
    );
    if let Some(label) = &issue.element_label {
        text.push_str(&format!("\nElement: {}", label));
    }
    if let Some(outcome) = issue.outcome {
        text.push_str(&format!("\nOutcome: {}", outcome));
    }
    if let Some(fix) = &issue.suggested_fix {
        text.push_str(&format!("\nSuggested fix: {}", fix));
    }
    text.push_str(&format!("\nCycle {} at {}", issue.cycle, issue.detected_at.to_rfc3339()));
    text
}

fn format_uptime(secs: u64) -> String {
    format!("{}m {}s", secs / 60, secs % 60)
}

fn summary_title(report: &RunReport) -> String {
    format!("Cycle {} finished: {}", report.cycle, report.termination)
}

fn summary_facts(report: &RunReport) -> Vec<(&'static str, String)> {
    vec![
        ("Entry", report.entry_url.clone()),
        ("Screens", report.screens.to_string()),
        (
            "Elements tested",
            format!("{} of {}", report.elements_visited, report.elements_total),
        ),
        ("Coverage", format!("{:.1}%", report.coverage_percent)),
        ("Errors", (report.errors + report.crashes).to_string()),
        ("Uptime", format_uptime(report.uptime_secs)),
    ]
}

/// Plain-text body of the end-of-cycle summary.
pub fn format_summary(report: &RunReport) -> String {
    let severity = report.summary_severity();
    let mut text = format!("[{} {}] {}", severity, severity_word(severity), summary_title(report));
    for (name, value) in summary_facts(report) {
        text.push_str(&format!("\n{}: {}", name, value));
    }
    if report.errors + report.crashes > 0 {
        text.push_str("\nSuggested fix: review the interaction log for the failing elements");
    }
    text
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::P0 => "Attention",
        Severity::P1 => "Warning",
        Severity::P2 => "Accent",
        Severity::P3 => "Good",
    }
}

/// Adaptive Card message as accepted by a Teams incoming webhook.
pub fn adaptive_card(
    title: &str,
    description: &str,
    severity: Severity,
    facts: &[(&str, String)],
    suggested_fix: Option<&str>,
) -> Value {
    let facts: Vec<Value> = facts
        .iter()
        .map(|(name, value)| json!({ "title": name, "value": value }))
        .collect();
    let mut body = vec![
        json!({
            "type": "TextBlock",
            "size": "Large",
            "weight": "Bolder",
            "color": severity_color(severity),
            "text": format!("[{}] {}", severity, title),
            "wrap": true
        }),
        json!({ "type": "TextBlock", "text": description, "wrap": true }),
        json!({ "type": "FactSet", "facts": facts }),
    ];
    if let Some(fix) = suggested_fix {
        body.push(json!({
            "type": "TextBlock",
            "text": format!("**Suggested fix:** {}", fix),
            "wrap": true,
            "color": "Good"
        }));
    }

    json!({
        "type": "message",
        "attachments": [{
            "contentType": "application/vnd.microsoft.card.adaptive",
            "content": {
                "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
                "type": "AdaptiveCard",
                "version": "1.4",
                "msteams": { "width": "Full" },
                "body": body
            }
        }]
    })
}

pub fn issue_card(issue: &Issue) -> Value {
    let mut facts = vec![
        ("Kind", issue.kind.to_string()),
        ("Category", issue.category.to_string()),
        ("Severity", format!("{} {}", issue.severity, severity_word(issue.severity))),
        ("Screen", issue.screen.url.clone()),
    ];
    if let Some(label) = &issue.element_label {
        facts.push(("Element", label.clone()));
    }
    if let Some(outcome) = issue.outcome {
        facts.push(("Outcome", outcome.to_string()));
    }
    facts.push(("Cycle", issue.cycle.to_string()));
    facts.push(("Detected", issue.detected_at.to_rfc3339()));

    adaptive_card(
        &issue.headline(),
        &issue.description,
        issue.severity,
        &facts,
        issue.suggested_fix.as_deref(),
    )
}

pub fn summary_card(report: &RunReport) -> Value {
    let errors = report.errors + report.crashes;
    let description = format!(
        "Exploration of {} finished after {} steps with {} new alert(s).",
        report.entry_url, report.steps_used, report.alerts_sent
    );
    adaptive_card(
        &summary_title(report),
        &description,
        report.summary_severity(),
        &summary_facts(report),
        (errors > 0).then_some("Review the interaction log for the failing elements."),
    )
}

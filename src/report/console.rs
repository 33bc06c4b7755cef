use crate::explorer::InteractionRecord;
use crate::outcome::Outcome;
use crate::regression::Issue;
use crate::report::report_model::RunReport;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a run report for terminal output.
///
/// Produces output like:
/// ```text
/// === Cycle 3 of https://app.example.com (run 1a2b) ===
///
/// Screens: 4  Transitions: 5  Coverage: 92.3% (12/13 elements)
/// Interactions: 14  Errors: 1  Crashes: 0
/// Issues: P0 0 | P1 1 | P2 0 | P3 1  (1 regression, 1 new screen, 0 possible removals)
///
/// ✗ [P1] regression TECHNICAL_ERROR: 'Save' on https://app.example.com/settings
///
/// === Ended: exhausted in 41.2s, 1 alert sent, 2 suppressed ===
/// ```
pub fn format_console_report(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Cycle {} of {} (run {}) ===\n\n",
        report.cycle, report.entry_url, report.run_id
    ));

    if !report.session_opened {
        out.push_str("Session could not be opened; nothing was explored.\n");
    }

    out.push_str(&format!(
        "Screens: {}  Transitions: {}  Coverage: {:.1}% ({}/{} elements)\n",
        report.screens,
        report.transitions,
        report.coverage_percent,
        report.elements_visited,
        report.elements_total
    ));
    out.push_str(&format!(
        "Interactions: {}  Errors: {}  Crashes: {}\n",
        report.interactions, report.errors, report.crashes
    ));

    let sev = &report.issues_by_severity;
    out.push_str(&format!(
        "Issues: P0 {} | P1 {} | P2 {} | P3 {}  ({} regression{}, {} new screen{}, {} possible removal{})\n",
        sev.p0,
        sev.p1,
        sev.p2,
        sev.p3,
        report.regressions,
        plural(report.regressions),
        report.new_screens,
        plural(report.new_screens),
        report.possible_removals,
        plural(report.possible_removals),
    ));

    if !report.alerted.is_empty() {
        out.push('\n');
        for issue in &report.alerted {
            out.push_str(&format!("\u{2717} {}\n", issue.headline()));
        }
    }

    let secs = report.duration_ms() as f64 / 1000.0;
    out.push_str(&format!(
        "\n=== Ended: {} in {:.1}s, {} alert{} sent, {} suppressed",
        report.termination,
        secs,
        report.alerts_sent,
        plural(report.alerts_sent),
        report.alerts_suppressed
    ));
    if !report.baseline_saved {
        out.push_str(", baseline unchanged");
    }
    out.push_str(" ===\n");

    out
}

/// Format issues, one per line, with their dedupe decision.
pub fn format_issue_list(alerted: &[Issue], suppressed: &[Issue]) -> String {
    let mut out = String::new();
    for issue in alerted {
        out.push_str(&format!("ALERT     {}\n", issue.headline()));
        out.push_str(&format!("          {}\n", issue.description));
    }
    for issue in suppressed {
        out.push_str(&format!("SUPPRESS  {}\n", issue.headline()));
    }
    out.push_str(&format!(
        "\n{} to alert, {} suppressed\n",
        alerted.len(),
        suppressed.len()
    ));
    out
}

/// Summarize an interaction log.
pub fn format_history(records: &[InteractionRecord], failures_only: bool) -> String {
    let mut out = String::new();
    let shown: Vec<&InteractionRecord> = records
        .iter()
        .filter(|r| !failures_only || r.outcome.is_failure())
        .collect();

    for r in &shown {
        let marker = match r.outcome {
            Outcome::Navigated => "\u{2192}",
            Outcome::NoChange => "\u{00b7}",
            Outcome::Error | Outcome::Crash => "\u{2717}",
        };
        let status = r.http_status.map(|s| format!(" HTTP {}", s)).unwrap_or_default();
        out.push_str(&format!(
            "{} cycle {:>3} #{:<4} {:<10} '{}' on {}{}\n",
            marker, r.cycle, r.seq, r.outcome, r.element_label, r.raw_url, status
        ));
    }

    let failures = records.iter().filter(|r| r.outcome.is_failure()).count();
    let cycles = records
        .iter()
        .map(|r| r.cycle)
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    out.push_str(&format!(
        "\n{} interactions over {} cycle{}, {} failure{}\n",
        records.len(),
        cycles,
        plural(cycles),
        failures,
        plural(failures)
    ));
    out
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::alert::AlertDispatcher;
use crate::collab::{DiagnosisOracle, ElementDiscovery, SessionFactory};
use crate::error::Result;
use crate::explorer::{ExploreConfig, Explorer};
use crate::identity::IdentityConfig;
use crate::regression::{Issue, dedupe, detect};
use crate::report::{RunReport, format_console_report};
use crate::store::{Baseline, BaselineStore, InteractionLog};

use super::cancel::CancelToken;

/// Settings of the continuous loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Root of baselines, reports and interaction logs (default `.screen-sentinel`)
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Pause between cycles (default 900)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Pause after a cycle that could not start (default 60)
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            refresh_interval_secs: default_refresh_interval(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

fn default_store_dir() -> PathBuf { PathBuf::from(".screen-sentinel") }
fn default_refresh_interval() -> u64 { 900 }
fn default_error_backoff() -> u64 { 60 }

/// Runs exploration cycles against one entry point and carries the
/// baseline from each cycle to the next.
pub struct Coordinator {
    entry_url: String,
    factory: Box<dyn SessionFactory>,
    discovery: Box<dyn ElementDiscovery>,
    diagnosis: Box<dyn DiagnosisOracle>,
    store: Box<dyn BaselineStore>,
    alerts: Option<AlertDispatcher>,
    log: Option<InteractionLog>,
    explore: ExploreConfig,
    identity: IdentityConfig,
    cancel: CancelToken,
    run_id: String,
    last_cycle: u64,
    started: Instant,
}

impl Coordinator {
    pub fn new(
        entry_url: &str,
        factory: Box<dyn SessionFactory>,
        discovery: Box<dyn ElementDiscovery>,
        diagnosis: Box<dyn DiagnosisOracle>,
        store: Box<dyn BaselineStore>,
    ) -> Self {
        Self {
            entry_url: entry_url.to_string(),
            factory,
            discovery,
            diagnosis,
            store,
            alerts: None,
            log: None,
            explore: ExploreConfig::default(),
            identity: IdentityConfig::default(),
            cancel: CancelToken::new(),
            run_id: Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
            last_cycle: 0,
            started: Instant::now(),
        }
    }

    pub fn with_config(mut self, explore: ExploreConfig, identity: IdentityConfig) -> Self {
        self.explore = explore;
        self.identity = identity;
        self
    }

    pub fn with_alerts(mut self, alerts: AlertDispatcher) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_log(mut self, log: InteractionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn alerts(&self) -> Option<&AlertDispatcher> {
        self.alerts.as_ref()
    }

    /// Stop alert delivery, waiting for queued alerts.
    pub fn shutdown(mut self) {
        if let Some(alerts) = self.alerts.take() {
            alerts.shutdown();
        }
    }

    /// One full cycle: explore, diff against the baseline, alert, persist.
    ///
    /// Cycles that end in `Error` or are cancelled still produce a report,
    /// but only completed cycles replace the baseline. What such a cycle
    /// alerted goes to the pending-alert ledger instead, so the next cycle
    /// does not alert it again. Fails only when the new baseline cannot be
    /// published.
    pub fn run_cycle(&mut self) -> Result<RunReport> {
        let previous = match self.store.load_baseline(&self.entry_url) {
            Ok(found) => found,
            Err(e) => {
                warn!(entry = %self.entry_url, error = %e, "baseline unavailable, treating as first run");
                None
            }
        };
        let pending = match self.store.load_pending_alerts(&self.entry_url) {
            Ok(pending) => pending,
            Err(e) => {
                warn!(entry = %self.entry_url, error = %e, "pending alerts unreadable, ignoring them");
                Vec::new()
            }
        };
        let cycle = self.last_cycle.max(previous.as_ref().map_or(0, |b| b.cycle)) + 1;
        self.last_cycle = cycle;
        info!(entry = %self.entry_url, cycle, run = %self.run_id, "cycle starting");

        // ---- Explore ----
        let mut session = match self.factory.open(&self.entry_url) {
            Ok(session) => session,
            Err(e) => {
                error!(entry = %self.entry_url, cycle, error = %e, "session could not be opened");
                let mut report = RunReport::session_failed(&self.entry_url, &self.run_id, cycle, &e.to_string());
                report.uptime_secs = self.started.elapsed().as_secs();
                self.persist_report(&report);
                self.send_summary(&report);
                return Ok(report);
            }
        };

        let mut result = {
            let mut explorer = Explorer::new(
                session.as_mut(),
                self.discovery.as_ref(),
                self.diagnosis.as_ref(),
                &self.entry_url,
                self.explore.clone(),
                self.identity.clone(),
            )
            .with_cycle(&self.run_id, cycle)
            .with_cancel(self.cancel.clone());
            if let Some(log) = &self.log {
                explorer = explorer.with_log(log);
            }
            explorer.run_to_end();
            explorer.into_result()
        };

        if let Err(e) = session.close() {
            warn!(cycle, error = %e, "session close failed");
        }

        if let Some(prev) = &previous {
            result
                .site_map
                .carry_history(&prev.site_map, self.identity.similarity_threshold);
        }

        // ---- Detect and alert ----
        let issues = detect(previous.as_ref(), &result, &self.identity);
        let mut known: Vec<Issue> = previous.as_ref().map(|b| b.issues.clone()).unwrap_or_default();
        known.extend(pending.iter().cloned());
        let deduped = dedupe(&known, issues.clone(), &self.identity);

        let mut alerts_sent = 0;
        if let Some(alerts) = &self.alerts {
            for issue in &deduped.alert {
                if alerts.notify(issue.clone()) {
                    alerts_sent += 1;
                }
            }
        }

        let mut report = RunReport::from_cycle(&self.entry_url, &result, &deduped, alerts_sent);
        report.uptime_secs = self.started.elapsed().as_secs();

        // ---- Publish ----
        if result.termination.completed() {
            let baseline = Baseline::from_cycle(&self.entry_url, &result, issues);
            if let Err(e) = self.store.save_baseline(&baseline) {
                error!(cycle, error = %e, "baseline could not be published");
                self.persist_report(&report);
                return Err(e);
            }
            report.baseline_saved = true;
            // The new baseline holds every issue of this cycle
            if !pending.is_empty() {
                self.save_pending(Vec::new());
            }
        } else {
            info!(cycle, reason = %result.termination, "cycle incomplete, baseline kept");
            if !deduped.alert.is_empty() {
                let mut ledger = pending;
                ledger.extend(deduped.alert.iter().cloned());
                self.save_pending(ledger);
            }
        }

        self.persist_report(&report);
        self.send_summary(&report);
        info!("\n{}", format_console_report(&report));
        Ok(report)
    }

    /// Run cycles until cancelled, pausing `refresh` between cycles and the
    /// error backoff after a cycle that could not run. Cancellation is
    /// checked before each cycle, between explorer steps and during pauses.
    ///
    /// Returns the number of cycles that ran.
    pub fn run_continuous(
        &mut self,
        refresh: Duration,
        error_backoff: Duration,
        mut on_report: impl FnMut(&RunReport),
    ) -> Result<u64> {
        let mut cycles = 0;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let pause = match self.run_cycle() {
                Ok(report) => {
                    cycles += 1;
                    on_report(&report);
                    if report.session_opened { refresh } else { error_backoff }
                }
                Err(e) => {
                    error!(entry = %self.entry_url, error = %e, "cycle failed");
                    error_backoff
                }
            };

            if self.cancel.is_cancelled() || !self.cancel.sleep(pause) {
                break;
            }
        }
        info!(entry = %self.entry_url, cycles, "continuous run stopped");
        Ok(cycles)
    }

    fn save_pending(&self, issues: Vec<Issue>) {
        if let Err(e) = self.store.save_pending_alerts(&self.entry_url, &issues) {
            warn!(pending = issues.len(), error = %e, "pending alerts could not be written");
        }
    }

    fn send_summary(&self, report: &RunReport) {
        if let Some(alerts) = &self.alerts {
            alerts.notify_summary(report);
        }
    }

    fn persist_report(&self, report: &RunReport) {
        if let Err(e) = self.store.save_report(report) {
            warn!(cycle = report.cycle, error = %e, "run report could not be written");
        }
    }
}

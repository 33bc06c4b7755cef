use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::collab::{
    Action, BrowserSession, Diagnosis, DiagnosisContext, DiagnosisOracle, ElementDiscovery, View,
};
use crate::coordinator::CancelToken;
use crate::error::{ExplorerError, Result};
use crate::identity::{IdentityConfig, ScreenKey, identify, same_domain};
use crate::outcome::{Outcome, VisitDecision, classify, visit_decision};
use crate::regression::RuleBasedDiagnosis;
use crate::sitemap::{DiscoveryStatus, Element, ElementId, ElementKind, ScreenId, SiteMap, Transition, VisitState};
use crate::store::InteractionLog;

use super::budget::{BudgetDecision, CycleBudget};
use super::config::ExploreConfig;
use super::record::{CycleResult, InteractionRecord};
use super::state::{ExplorerState, Termination};
use super::values::{guess_value, is_submit_like};

/// Drives one exploration cycle over a live session.
///
/// The explorer owns the cycle's `SiteMap` and hands it back through
/// `into_result`. Exactly one action is in flight at a time: every
/// interaction observes its own settled result before the next decision.
pub struct Explorer<'a> {
    session: &'a mut dyn BrowserSession,
    discovery: &'a dyn ElementDiscovery,
    diagnosis: &'a dyn DiagnosisOracle,
    log: Option<&'a InteractionLog>,
    cancel: CancelToken,

    entry_url: String,
    config: ExploreConfig,
    identity: IdentityConfig,
    run_id: String,
    cycle: u64,

    site_map: SiteMap,
    records: Vec<InteractionRecord>,
    state: ExplorerState,
    budget: CycleBudget,
    termination: Option<Termination>,
    started_at: DateTime<Utc>,

    /// Screen the session is believed to show; `None` after landing somewhere unidentifiable
    current: Option<ScreenId>,
    /// Latest settled capture of `current`
    view: Option<View>,
    next_element: Option<ElementId>,
    recovery_target: Option<ScreenId>,
}

impl<'a> Explorer<'a> {
    pub fn new(
        session: &'a mut dyn BrowserSession,
        discovery: &'a dyn ElementDiscovery,
        diagnosis: &'a dyn DiagnosisOracle,
        entry_url: &str,
        config: ExploreConfig,
        identity: IdentityConfig,
    ) -> Self {
        let budget = CycleBudget::new(&config);
        Self {
            session,
            discovery,
            diagnosis,
            log: None,
            cancel: CancelToken::new(),
            entry_url: entry_url.to_string(),
            config,
            identity,
            run_id: String::new(),
            cycle: 1,
            site_map: SiteMap::new(),
            records: Vec::new(),
            state: ExplorerState::Idle,
            budget,
            termination: None,
            started_at: Utc::now(),
            current: None,
            view: None,
            next_element: None,
            recovery_target: None,
        }
    }

    pub fn with_cycle(mut self, run_id: &str, cycle: u64) -> Self {
        self.run_id = run_id.to_string();
        self.cycle = cycle;
        self
    }

    pub fn with_log(mut self, log: &'a InteractionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ExplorerState {
        self.state
    }

    pub fn site_map(&self) -> &SiteMap {
        &self.site_map
    }

    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    pub fn current_screen(&self) -> Option<ScreenId> {
        self.current
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn steps_used(&self) -> u32 {
        self.budget.steps_used()
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Advance the state machine by one transition and return the new state.
    /// Terminal states are sticky.
    pub fn step(&mut self) -> ExplorerState {
        if self.state.is_terminal() {
            return self.state;
        }
        if self.cancel.is_cancelled() {
            return self.finish(Termination::Cancelled);
        }
        if self.budget.time_exhausted() {
            return self.finish(Termination::TimeBudget);
        }

        let result = match self.state {
            ExplorerState::Idle => self.start(),
            ExplorerState::Discovering => self.discover(),
            ExplorerState::Selecting => self.select(),
            ExplorerState::Interacting => self.interact(),
            ExplorerState::Recovering => self.recover(),
            terminal => Ok(terminal),
        };

        match result {
            Ok(next) => {
                if next != self.state {
                    debug!(cycle = self.cycle, from = ?self.state, to = ?next, "state change");
                }
                self.state = next;
            }
            Err(ExplorerError::Cancelled) => {
                self.finish(Termination::Cancelled);
            }
            Err(e) => {
                warn!(cycle = self.cycle, error = %e, "cycle aborted");
                self.termination = Some(Termination::Failed {
                    message: e.to_string(),
                });
                self.state = ExplorerState::Error;
            }
        }
        self.state
    }

    /// Step until `Complete` or `Error`.
    pub fn run_to_end(&mut self) -> ExplorerState {
        while !self.state.is_terminal() {
            self.step();
        }
        self.state
    }

    pub fn into_result(self) -> CycleResult {
        let termination = self.termination.unwrap_or_else(|| Termination::Failed {
            message: "cycle abandoned before completion".to_string(),
        });
        CycleResult {
            run_id: self.run_id,
            cycle: self.cycle,
            site_map: self.site_map,
            records: self.records,
            termination,
            steps_used: self.budget.steps_used(),
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }

    fn finish(&mut self, termination: Termination) -> ExplorerState {
        let stats = self.site_map.coverage_stats();
        info!(
            cycle = self.cycle,
            reason = %termination,
            steps = self.budget.steps_used(),
            screens = stats.screens,
            coverage = stats.coverage_percent(),
            "cycle complete"
        );
        self.termination = Some(termination);
        self.state = ExplorerState::Complete;
        self.state
    }

    // ---- Idle ----

    fn start(&mut self) -> Result<ExplorerState> {
        info!(cycle = self.cycle, entry = %self.entry_url, "exploration started");
        let (mut view, mut key) = self.settle()?;
        if key.is_unknown() {
            // Identity failures are retried once from a fresh load
            self.session.act(&Action::navigate(&self.entry_url))?;
            (view, key) = self.settle()?;
        }
        let ScreenKey::Known(signature) = key else {
            return Err(ExplorerError::Identity(format!(
                "entry screen at {} could not be identified",
                self.entry_url
            )));
        };

        let threshold = self.identity.similarity_threshold;
        let (id, _) = self.site_map.add_screen(signature, &view.url, self.cycle, threshold);
        self.arrive(id, view);
        Ok(ExplorerState::Discovering)
    }

    // ---- Discovering ----

    fn discover(&mut self) -> Result<ExplorerState> {
        let Some(screen_id) = self.current else {
            return Ok(ExplorerState::Selecting);
        };
        let max_attempts = self.config.max_discovery_attempts.max(1);
        let needed = self.site_map.screen(screen_id).is_some_and(|s| match s.discovery {
            DiscoveryStatus::Pending => true,
            DiscoveryStatus::Partial => s.discovery_attempts < max_attempts,
            DiscoveryStatus::Complete => false,
        });
        if !needed {
            return Ok(ExplorerState::Selecting);
        }

        let view = match self.view.take() {
            Some(view) => Ok(view),
            None => self.session.capture(),
        };
        let discovered = match view {
            Ok(view) => {
                let discovered = self.discovery.discover(&view);
                self.view = Some(view);
                discovered
            }
            Err(e) => Err(e),
        };

        let status = match discovered {
            Ok(candidates) => {
                let summary = self
                    .site_map
                    .merge_elements(screen_id, &candidates, self.identity.region_iou);
                info!(
                    cycle = self.cycle,
                    screen = screen_id.0,
                    added = summary.added,
                    merged = summary.merged,
                    "screen discovered"
                );
                DiscoveryStatus::Complete
            }
            Err(e) if e.is_fatal_to_cycle() => return Err(e),
            Err(e) => {
                warn!(cycle = self.cycle, screen = screen_id.0, error = %e, "discovery incomplete");
                DiscoveryStatus::Partial
            }
        };

        if let Some(screen) = self.site_map.screen_mut(screen_id) {
            screen.discovery_attempts += 1;
            screen.discovery = status;
        }
        Ok(ExplorerState::Selecting)
    }

    // ---- Selecting ----

    fn select(&mut self) -> Result<ExplorerState> {
        let candidate = match self.current {
            Some(screen) => self.next_on_screen(screen),
            None => None,
        };

        let work_remains = candidate.is_some() || !self.site_map.get_unvisited_screens().is_empty();
        if !work_remains {
            return Ok(self.finish(Termination::Exhausted));
        }

        if let BudgetDecision::Block(reason) = self.budget.check() {
            debug!(cycle = self.cycle, reason, "budget exhausted");
            let termination = if self.budget.time_exhausted() {
                Termination::TimeBudget
            } else {
                Termination::StepBudget
            };
            return Ok(self.finish(termination));
        }

        if let Some(element) = candidate {
            self.next_element = Some(element);
            return Ok(ExplorerState::Interacting);
        }

        // Current screen is done; move to the next screen in breadth-first order
        let target = self
            .site_map
            .get_unvisited_screens()
            .into_iter()
            .find(|id| Some(*id) != self.current);
        match target {
            Some(target) => {
                debug!(cycle = self.cycle, target = target.0, "moving to next screen");
                self.recovery_target = Some(target);
                Ok(ExplorerState::Recovering)
            }
            None => Ok(self.finish(Termination::Exhausted)),
        }
    }

    /// First unvisited element worth an interaction. Elements that must not be
    /// touched (off-domain, below a fold already scrolled too often) are
    /// marked `Skipped` on the way.
    fn next_on_screen(&mut self, screen_id: ScreenId) -> Option<ElementId> {
        let scroll_exhausted = self
            .site_map
            .screen(screen_id)
            .is_some_and(|s| s.scroll_extends >= self.config.max_scroll_extends);

        for id in self.site_map.get_unvisited_elements(screen_id) {
            let Some(element) = self.site_map.element(screen_id, id) else {
                continue;
            };
            let off_domain = element
                .target_url
                .as_deref()
                .is_some_and(|url| !same_domain(&self.entry_url, url));
            let skip = if off_domain {
                Some("off-domain")
            } else if element.region.is_below_fold() && scroll_exhausted {
                Some("below fold")
            } else {
                None
            };

            match skip {
                Some(reason) => {
                    debug!(screen = screen_id.0, element = id.0, reason, "element skipped");
                    self.site_map
                        .mark_element(screen_id, id, VisitState::Skipped, Some(reason));
                }
                None => return Some(id),
            }
        }
        None
    }

    // ---- Interacting ----

    fn interact(&mut self) -> Result<ExplorerState> {
        let (Some(origin), Some(element_id)) = (self.current, self.next_element.take()) else {
            return Ok(ExplorerState::Selecting);
        };
        let Some(element) = self.site_map.element(origin, element_id).cloned() else {
            return Ok(ExplorerState::Selecting);
        };
        let Some(origin_signature) = self.site_map.screen(origin).map(|s| s.signature.clone()) else {
            return Ok(ExplorerState::Selecting);
        };
        let origin_url = self.view.as_ref().map(|v| v.url.clone()).unwrap_or_else(|| origin_signature.url.clone());

        let actions = self.build_actions(origin, &element);
        if element.region.is_below_fold() {
            if let Some(screen) = self.site_map.screen_mut(origin) {
                screen.scroll_extends += 1;
            }
        }

        // Drop signals that belong to earlier actions
        self.session.take_signals();
        self.budget.consume_step();
        let started_at = Utc::now();
        let clock = Instant::now();
        debug!(
            cycle = self.cycle,
            screen = origin.0,
            element = element_id.0,
            label = %element.label,
            "interacting"
        );

        // ---- Dispatch ----
        let mut actuator_failure = None;
        for action in &actions {
            match self.session.act(action) {
                Ok(()) => {}
                Err(e) if e.is_fatal_to_cycle() => return Err(e),
                Err(e) => {
                    actuator_failure = Some(e);
                    break;
                }
            }
        }

        // ---- Observe ----
        let observed = match actuator_failure {
            Some(e) => {
                warn!(screen = origin.0, element = element_id.0, error = %e, "action failed");
                None
            }
            None => match self.settle() {
                Ok(settled) => Some(settled),
                Err(e) if e.is_fatal_to_cycle() => return Err(e),
                Err(e) => {
                    warn!(screen = origin.0, element = element_id.0, error = %e, "capture failed");
                    None
                }
            },
        };

        let mut signals = self.session.take_signals();
        let (view, key, outcome) = match observed {
            None => (None, ScreenKey::Unknown, Outcome::Error),
            Some((mut view, mut key)) => {
                if key.is_unknown() && !signals.crashed() && !signals.http_error() {
                    // One more look before giving up on identity
                    match self.recapture() {
                        Ok(next) => {
                            view = next;
                            key = identify(&view, &self.identity);
                        }
                        Err(e) if e.is_fatal_to_cycle() => return Err(e),
                        Err(e) => debug!(error = %e, "second capture failed"),
                    }
                    signals = signals.merge(self.session.take_signals());
                }
                if key.is_unknown() && !signals.crashed() && !signals.http_error() {
                    warn!(screen = origin.0, element = element_id.0, "result unidentifiable, skipping element");
                    self.site_map
                        .mark_element(origin, element_id, VisitState::Skipped, Some("unidentifiable"));
                    return Ok(self.recover_to(origin, None));
                }
                signals.visual_error |= self.visual_error(&view);
                let before = ScreenKey::Known(origin_signature.clone());
                let outcome = classify(&before, &key, &signals, self.identity.similarity_threshold);
                (Some(view), key, outcome)
            }
        };

        let landed_url = view.as_ref().map(|v| v.url.clone());
        let diagnosis = outcome.is_failure().then(|| {
            self.diagnose(
                view.as_ref(),
                DiagnosisContext {
                    url: origin_url.clone(),
                    element_label: element.label.clone(),
                    outcome,
                    http_status: signals.http_status,
                },
            )
        });

        let record = InteractionRecord {
            run_id: self.run_id.clone(),
            cycle: self.cycle,
            seq: self.records.len() as u64 + 1,
            screen: origin_signature,
            raw_url: origin_url,
            element: element.key(),
            element_label: element.label.clone(),
            element_kind: element.kind,
            actions,
            outcome,
            http_status: signals.http_status,
            landed_url,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            diagnosis,
        };
        self.append_record(record);

        let attempts = self.site_map.record_attempt(origin, element_id, outcome);
        info!(
            cycle = self.cycle,
            screen = origin.0,
            element = element_id.0,
            outcome = %outcome,
            attempts,
            "interaction classified"
        );

        self.apply_outcome(origin, &element, outcome, attempts, view, key)
    }

    fn apply_outcome(
        &mut self,
        origin: ScreenId,
        element: &Element,
        outcome: Outcome,
        attempts: u32,
        view: Option<View>,
        key: ScreenKey,
    ) -> Result<ExplorerState> {
        let threshold = self.identity.similarity_threshold;

        if outcome == Outcome::NoChange && element.kind == ElementKind::Input {
            // Typing into a field is not expected to change the screen
            self.site_map
                .mark_element(origin, element.id, VisitState::VisitedOk, None);
            self.view = view;
            return Ok(ExplorerState::Selecting);
        }

        match visit_decision(outcome, attempts, self.config.unresponsive_after) {
            VisitDecision::Mark(state, note) => {
                self.site_map.mark_element(origin, element.id, state, note)
            }
            VisitDecision::Retry => {}
        }

        match outcome {
            Outcome::NoChange => {
                self.view = view;
                Ok(ExplorerState::Selecting)
            }
            Outcome::Navigated => {
                let (Some(view), ScreenKey::Known(signature)) = (view, key) else {
                    return Ok(self.recover_to(origin, None));
                };
                if !same_domain(&self.entry_url, &view.url) {
                    info!(screen = origin.0, element = element.id.0, url = %view.url, "navigation left the domain");
                    self.site_map
                        .mark_element(origin, element.id, VisitState::Skipped, Some("off-domain"));
                    return Ok(self.recover_to(origin, None));
                }
                let (to, _) = self
                    .site_map
                    .add_screen(signature, &view.url, self.cycle, threshold);
                self.site_map.add_transition(origin, element.id, to);
                self.arrive(to, view);
                Ok(ExplorerState::Discovering)
            }
            Outcome::Error | Outcome::Crash => {
                // Failing results never enter the map; return to the origin
                let landed = key
                    .signature()
                    .and_then(|sig| self.site_map.find_screen(sig, threshold));
                if landed == Some(origin) {
                    self.view = view;
                }
                Ok(self.recover_to(origin, landed))
            }
        }
    }

    // ---- Recovering ----

    fn recover_to(&mut self, target: ScreenId, position: Option<ScreenId>) -> ExplorerState {
        self.current = position;
        if position != Some(target) {
            self.view = None;
        }
        self.recovery_target = Some(target);
        ExplorerState::Recovering
    }

    fn recover(&mut self) -> Result<ExplorerState> {
        let Some(target) = self.recovery_target.take() else {
            return Ok(ExplorerState::Selecting);
        };
        if self.current == Some(target) {
            return Ok(ExplorerState::Discovering);
        }

        match self.reach(target) {
            Ok(view) => {
                info!(cycle = self.cycle, target = target.0, "recovered");
                self.arrive(target, view);
                Ok(ExplorerState::Discovering)
            }
            Err(e) if e.is_fatal_to_cycle() => Err(e),
            Err(e) => {
                warn!(cycle = self.cycle, error = %e, "screen unreachable this cycle");
                self.site_map.mark_unreachable(target, true);
                self.resync()
            }
        }
    }

    /// Replay a recorded path to `target`: from the current screen when one
    /// exists, otherwise from a fresh load of the entry URL.
    fn reach(&mut self, target: ScreenId) -> Result<View> {
        let direct = self
            .current
            .and_then(|from| self.site_map.path_between(from, target));
        if let Some(path) = direct {
            debug!(target = target.0, hops = path.len(), "replaying path");
            return self.replay(target, &path);
        }

        let view = self.reset_to_entry()?;
        let entry = self.entry_screen()?;
        if entry == target {
            return Ok(view);
        }
        let path = self
            .site_map
            .path_between(entry, target)
            .ok_or_else(|| ExplorerError::Recovery {
                target: target.0,
                reason: "no recorded path from the entry screen".to_string(),
            })?;
        debug!(target = target.0, hops = path.len(), "replaying path from entry");
        self.replay(target, &path)
    }

    fn replay(&mut self, target: ScreenId, path: &[Transition]) -> Result<View> {
        let threshold = self.identity.similarity_threshold;
        let mut last = None;

        for hop in path {
            let Some(element) = self.site_map.element(hop.from, hop.element).cloned() else {
                return Err(ExplorerError::Recovery {
                    target: target.0,
                    reason: format!("element {} missing on screen {}", hop.element.0, hop.from.0),
                });
            };
            for action in self.build_actions(hop.from, &element) {
                self.session.act(&action)?;
            }
            let (view, key) = self.settle()?;
            let expected = self.site_map.screen(hop.to).map(|s| &s.signature);
            let arrived = match (key.signature(), expected) {
                (Some(sig), Some(expected)) => sig.matches(expected, threshold),
                _ => false,
            };
            if !arrived {
                return Err(ExplorerError::Recovery {
                    target: target.0,
                    reason: format!("'{}' no longer leads to screen {}", element.label, hop.to.0),
                });
            }
            self.current = Some(hop.to);
            last = Some(view);
        }

        match last {
            Some(view) => Ok(view),
            None => self.session.capture(),
        }
    }

    fn reset_to_entry(&mut self) -> Result<View> {
        debug!(entry = %self.entry_url, "resetting to entry");
        self.session.act(&Action::navigate(&self.entry_url))?;
        let (view, key) = self.settle()?;
        let entry = self.entry_screen()?;
        let matches_entry = match (key.signature(), self.site_map.screen(entry)) {
            (Some(sig), Some(screen)) => sig.matches(&screen.signature, self.identity.similarity_threshold),
            _ => false,
        };
        if !matches_entry {
            return Err(ExplorerError::Recovery {
                target: entry.0,
                reason: "entry URL no longer shows the entry screen".to_string(),
            });
        }
        self.current = Some(entry);
        Ok(view)
    }

    fn entry_screen(&self) -> Result<ScreenId> {
        self.site_map.entry.ok_or_else(|| ExplorerError::Recovery {
            target: 0,
            reason: "no entry screen recorded".to_string(),
        })
    }

    /// Work out where the session is after a failed recovery.
    fn resync(&mut self) -> Result<ExplorerState> {
        let threshold = self.identity.similarity_threshold;
        let (view, key) = match self.settle() {
            Ok(settled) => settled,
            Err(e) if e.is_fatal_to_cycle() => return Err(e),
            Err(e) => {
                debug!(error = %e, "resync capture failed");
                (View::new(Vec::new(), &self.entry_url), ScreenKey::Unknown)
            }
        };

        if let ScreenKey::Known(signature) = key {
            if same_domain(&self.entry_url, &view.url) {
                let (id, added) = self
                    .site_map
                    .add_screen(signature, &view.url, self.cycle, threshold);
                self.arrive(id, view);
                return Ok(if added {
                    ExplorerState::Discovering
                } else {
                    ExplorerState::Selecting
                });
            }
        }

        // Somewhere unknown; the entry screen is the only safe harbour
        let reset = self
            .reset_to_entry()
            .and_then(|view| self.entry_screen().map(|entry| (entry, view)));
        match reset {
            Ok((entry, view)) => self.arrive(entry, view),
            Err(e) if e.is_fatal_to_cycle() => return Err(e),
            Err(e) => {
                // Position unknown; selection keeps trying targets from the
                // entry URL and marks each one it cannot reach
                warn!(cycle = self.cycle, error = %e, "entry screen unreachable, position unknown");
                self.current = None;
                self.view = None;
            }
        }
        Ok(ExplorerState::Selecting)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn arrive(&mut self, screen: ScreenId, view: View) {
        if self.site_map.screen(screen).is_some_and(|s| s.unreachable) {
            self.site_map.mark_unreachable(screen, false);
        }
        self.current = Some(screen);
        self.view = Some(view);
    }

    /// Actions needed to exercise `element` on `screen`.
    fn build_actions(&self, screen: ScreenId, element: &Element) -> Vec<Action> {
        let mut actions = Vec::new();
        if element.region.is_below_fold() {
            actions.push(Action::Scroll {
                region: element.region,
            });
        }

        match element.kind {
            ElementKind::Input => {
                actions.push(Action::click(element.region));
                actions.push(Action::type_text(
                    element.region,
                    &guess_value(&element.label, element.input_type.as_deref()),
                ));
            }
            _ if is_submit_like(element) => {
                // Populate the form before submitting it
                let inputs = self
                    .site_map
                    .screen(screen)
                    .map(|s| s.elements.iter().filter(|e| e.kind == ElementKind::Input).collect::<Vec<_>>())
                    .unwrap_or_default();
                for input in inputs {
                    actions.push(Action::click(input.region));
                    actions.push(Action::type_text(
                        input.region,
                        &guess_value(&input.label, input.input_type.as_deref()),
                    ));
                }
                actions.push(Action::click(element.region));
            }
            _ => actions.push(Action::click(element.region)),
        }
        actions
    }

    /// Capture until two consecutive captures identify the same screen, or
    /// `settle_attempts` captures were taken.
    fn settle(&mut self) -> Result<(View, ScreenKey)> {
        let threshold = self.identity.similarity_threshold;
        let mut view = self.session.capture()?;
        let mut key = identify(&view, &self.identity);

        for _ in 1..self.config.settle_attempts.max(1) {
            self.session.act(&Action::wait(self.config.settle_delay_ms))?;
            let next_view = self.session.capture()?;
            let next_key = identify(&next_view, &self.identity);
            let stable = key.same_screen(&next_key, threshold);
            view = next_view;
            key = next_key;
            if stable {
                break;
            }
        }
        Ok((view, key))
    }

    fn recapture(&mut self) -> Result<View> {
        self.session.act(&Action::wait(self.config.settle_delay_ms))?;
        self.session.capture()
    }

    fn visual_error(&self, view: &View) -> bool {
        self.discovery.visual_error(view).unwrap_or_else(|e| {
            debug!(error = %e, "visual error check unavailable");
            false
        })
    }

    fn diagnose(&self, view: Option<&View>, context: DiagnosisContext) -> Diagnosis {
        if let Some(view) = view {
            match self.diagnosis.diagnose(view, &context) {
                Ok(diagnosis) => return diagnosis,
                Err(e) => warn!(error = %e, "diagnosis unavailable, using rule-based triage"),
            }
        }
        RuleBasedDiagnosis::diagnose_context(&context)
    }

    fn append_record(&mut self, record: InteractionRecord) {
        if let Some(log) = self.log {
            if let Err(e) = log.append(&record) {
                warn!(seq = record.seq, error = %e, "interaction log append failed");
            }
        }
        self.records.push(record);
    }
}

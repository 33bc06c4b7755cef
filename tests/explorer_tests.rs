mod common;

use common::mock_app::{
    ENTRY, Effect, FixedDiagnosis, MockApp, UnavailableDiagnosis, explore, explore_with, fast_config,
    two_screen_app,
};
use screen_sentinel::collab::{Action, ElementCandidate};
use screen_sentinel::coordinator::CancelToken;
use screen_sentinel::explorer::{
    ExploreConfig, Explorer, ExplorerState, FieldType, Termination, classify_field_type, guess_value,
};
use screen_sentinel::identity::IdentityConfig;
use screen_sentinel::outcome::Outcome;
use screen_sentinel::regression::{IssueCategory, RuleBasedDiagnosis, Severity};
use screen_sentinel::sitemap::site_map::DISMISS_LABEL;
use screen_sentinel::sitemap::{DiscoveryStatus, ElementKind, Region, ScreenId, SiteMap, VisitState};

// ============================================================================
// Helpers
// ============================================================================

fn visit_of(map: &SiteMap, screen: usize, label: &str) -> (VisitState, Option<String>) {
    let element = map.screens[screen]
        .elements
        .iter()
        .find(|e| e.label == label.to_lowercase() || e.label == label)
        .unwrap_or_else(|| panic!("element '{}' not on screen {}", label, screen));
    (element.visit, element.note.clone())
}

fn outcomes(result: &screen_sentinel::explorer::CycleResult) -> Vec<Outcome> {
    result.records.iter().map(|r| r.outcome).collect()
}

// ============================================================================
// Full cycles
// ============================================================================

#[test]
fn test_two_screens_one_transition_one_error() {
    let app = two_screen_app();
    let result = explore(&app, fast_config());

    assert_eq!(result.termination, Termination::Exhausted);
    assert_eq!(result.site_map.screens.len(), 2);
    assert_eq!(result.site_map.transitions.len(), 1);
    assert_eq!(outcomes(&result), vec![Outcome::Navigated, Outcome::Error]);

    let error = &result.records[1];
    assert_eq!(error.element_label, "Delete item");
    assert_eq!(error.http_status, Some(500));
    assert!(error.diagnosis.is_some());

    let stats = result.stats();
    assert_eq!(stats.unvisited, 0);
    assert_eq!(stats.coverage_percent(), 100.0);
    assert!(result.full_coverage());
    assert_eq!(result.steps_used, 2);
}

#[test]
fn test_records_are_numbered_in_order() {
    let app = two_screen_app();
    let result = explore(&app, fast_config());

    let seqs: Vec<u64> = result.records.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert!(result.records.iter().all(|r| r.cycle == 1 && r.run_id == "test-run"));
}

#[test]
fn test_cyclic_app_terminates() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("details", "/details", 2)
        .element("home", "Go to details", ElementKind::Link, Effect::Goto("details"))
        .element("details", "Go home", ElementKind::Link, Effect::Goto("home"));

    let result = explore(&app, fast_config());

    assert_eq!(result.termination, Termination::Exhausted);
    assert_eq!(result.site_map.screens.len(), 2);
    assert_eq!(result.site_map.transitions.len(), 2);
    assert_eq!(result.records.len(), 2);
}

#[test]
fn test_step_budget_stops_cycle() {
    let mut app = MockApp::new().screen("home", "/", 1);
    for i in 1..=5 {
        app = app.button("home", &format!("Option {}", i), Effect::Stay);
    }
    let config = ExploreConfig {
        step_budget: 3,
        unresponsive_after: 1,
        ..fast_config()
    };

    let result = explore(&app, config);

    assert_eq!(result.termination, Termination::StepBudget);
    assert_eq!(result.steps_used, 3);
    let stats = result.stats();
    assert_eq!(stats.elements_visited(), 3);
    assert_eq!(stats.unvisited, 2);
    assert!(!result.full_coverage());
}

#[test]
fn test_zero_time_budget_ends_before_any_interaction() {
    let app = two_screen_app();
    let config = ExploreConfig {
        time_budget_secs: 0,
        ..fast_config()
    };

    let result = explore(&app, config);

    assert_eq!(result.termination, Termination::TimeBudget);
    assert!(result.records.is_empty());
    assert!(result.termination.completed());
}

#[test]
fn test_unresponsive_element_is_retried_then_marked() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .button("home", "Do nothing", Effect::Stay);

    let result = explore(&app, fast_config());

    assert_eq!(outcomes(&result), vec![Outcome::NoChange, Outcome::NoChange]);
    let (visit, note) = visit_of(&result.site_map, 0, "Do nothing");
    assert_eq!(visit, VisitState::VisitedError);
    assert_eq!(note.as_deref(), Some("unresponsive"));
    assert_eq!(app.clicks("home", "Do nothing"), 2);
}

#[test]
fn test_crash_is_recorded_and_never_mapped() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .button("home", "Launch report", Effect::Crash);

    let result = explore(&app, fast_config());

    assert_eq!(result.termination, Termination::Exhausted);
    assert_eq!(outcomes(&result), vec![Outcome::Crash]);
    assert_eq!(result.site_map.screens.len(), 1);
    let (visit, note) = visit_of(&result.site_map, 0, "Launch report");
    assert_eq!(visit, VisitState::VisitedError);
    assert_eq!(note.as_deref(), Some("crash"));

    let diagnosis = result.records[0].diagnosis.as_ref().expect("crash diagnosed");
    assert_eq!(diagnosis.severity, Severity::P0);
}

#[test]
fn test_visual_error_screen_is_an_error_not_a_navigation() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("oops", "/oops", 2)
        .visual_error_on("oops")
        .element("home", "Open settings", ElementKind::Link, Effect::Goto("oops"));

    let result = explore(&app, fast_config());

    assert_eq!(outcomes(&result), vec![Outcome::Error]);
    assert_eq!(result.site_map.screens.len(), 1);
    assert!(result.site_map.transitions.is_empty());
}

// ============================================================================
// Element selection
// ============================================================================

#[test]
fn test_overlay_dismiss_is_tried_first() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("dialog", "/", 3)
        .element("home", "Open dialog", ElementKind::Button, Effect::Goto("dialog"))
        .button("dialog", "Confirm", Effect::Stay)
        .overlay("dialog", "home");

    let result = explore(&app, fast_config());

    assert_eq!(result.site_map.screens.len(), 2);
    assert!(result.site_map.screens[1].overlay);
    assert_eq!(result.records[1].element_label, DISMISS_LABEL);
    assert_eq!(result.records[1].outcome, Outcome::Navigated);
    assert_eq!(
        result.records[1].actions,
        vec![Action::click(Region::new(0, 0, 20, 20))]
    );
    // Confirm is still reached by replaying the recorded path
    assert_eq!(app.clicks("dialog", "Confirm"), 2);
    assert_eq!(result.stats().unvisited, 0);
}

#[test]
fn test_high_priority_elements_go_first() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .candidate(
            "home",
            ElementCandidate::new("Footer link", ElementKind::Link, Region::new(800, 100, 850, 300))
                .with_priority(screen_sentinel::sitemap::Priority::Low),
            Effect::Stay,
        )
        .candidate(
            "home",
            ElementCandidate::new("Main action", ElementKind::Button, Region::new(200, 100, 250, 300))
                .with_priority(screen_sentinel::sitemap::Priority::High),
            Effect::Stay,
        );

    let result = explore(&app, ExploreConfig {
        unresponsive_after: 1,
        ..fast_config()
    });

    let labels: Vec<&str> = result.records.iter().map(|r| r.element_label.as_str()).collect();
    assert_eq!(labels, vec!["Main action", "Footer link"]);
}

#[test]
fn test_off_domain_target_is_skipped_without_clicking() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("about", "/about", 2)
        .candidate(
            "home",
            ElementCandidate::new("Partner site", ElementKind::Link, Region::new(100, 100, 150, 500))
                .with_target("https://partner.example/welcome"),
            Effect::Offsite("https://partner.example/welcome"),
        )
        .candidate(
            "home",
            ElementCandidate::new("About us", ElementKind::Link, Region::new(200, 100, 250, 500))
                .with_target("/about"),
            Effect::Goto("about"),
        );

    let result = explore(&app, fast_config());

    assert_eq!(app.clicks("home", "Partner site"), 0);
    let (visit, note) = visit_of(&result.site_map, 0, "Partner site");
    assert_eq!(visit, VisitState::Skipped);
    assert_eq!(note.as_deref(), Some("off-domain"));
    assert_eq!(result.site_map.screens.len(), 2);
}

#[test]
fn test_navigation_off_domain_is_skipped_and_recovered() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .element("home", "Documentation", ElementKind::Link, Effect::Offsite("https://docs.other.test/"))
        .button("home", "Refresh", Effect::Stay);

    let result = explore(&app, fast_config());

    assert_eq!(result.site_map.screens.len(), 1);
    let (visit, note) = visit_of(&result.site_map, 0, "Documentation");
    assert_eq!(visit, VisitState::Skipped);
    assert_eq!(note.as_deref(), Some("off-domain"));
    assert_eq!(result.records[0].landed_url.as_deref(), Some("https://docs.other.test/"));
    assert!(
        app.interactions()
            .contains(&Action::navigate(ENTRY)),
        "session should be reset to the entry URL"
    );
    // Exploration resumed on the entry screen
    assert_eq!(app.clicks("home", "Refresh"), 2);
}

#[test]
fn test_entry_unreachable_after_leaving_site_ends_cycle_cleanly() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("settings", "/settings", 2)
        .element("home", "Settings", ElementKind::Link, Effect::Goto("settings"))
        .element("settings", "Help center", ElementKind::Link, Effect::Offsite("https://help.other.test/"))
        .button("settings", "Save", Effect::Stay);
    // The session still works, but no URL loads any more
    app.block_navigation(true);

    let result = explore(&app, fast_config());

    assert_eq!(result.termination, Termination::Exhausted);
    assert!(result.termination.completed());
    let (visit, note) = visit_of(&result.site_map, 1, "Help center");
    assert_eq!(visit, VisitState::Skipped);
    assert_eq!(note.as_deref(), Some("off-domain"));
    // Stranded off-site, the remaining work is abandoned for this cycle
    assert!(result.site_map.screens[1].unreachable);
    assert_eq!(app.clicks("settings", "Save"), 0);
}

#[test]
fn test_below_fold_scrolls_until_cap() {
    let first = Region::new(1200, 100, 1250, 500);
    let second = Region::new(1400, 100, 1450, 500);
    let app = MockApp::new()
        .screen("home", "/", 1)
        .candidate("home", ElementCandidate::new("Footer one", ElementKind::Button, first), Effect::Stay)
        .candidate("home", ElementCandidate::new("Footer two", ElementKind::Button, second), Effect::Stay);
    let config = ExploreConfig {
        max_scroll_extends: 1,
        unresponsive_after: 1,
        ..fast_config()
    };

    let result = explore(&app, config);

    assert_eq!(
        result.records[0].actions,
        vec![Action::Scroll { region: first }, Action::click(first)]
    );
    assert_eq!(result.site_map.screens[0].scroll_extends, 1);
    let (visit, note) = visit_of(&result.site_map, 0, "Footer two");
    assert_eq!(visit, VisitState::Skipped);
    assert_eq!(note.as_deref(), Some("below fold"));
    assert_eq!(app.clicks("home", "Footer two"), 0);
}

#[test]
fn test_submit_fills_form_fields_first() {
    let app = MockApp::new()
        .screen("login", "/", 1)
        .screen("dashboard", "/dashboard", 2)
        .candidate(
            "login",
            ElementCandidate::new("Email", ElementKind::Input, Region::new(100, 100, 150, 500))
                .with_input_type("email"),
            Effect::Stay,
        )
        .candidate(
            "login",
            ElementCandidate::new("Password", ElementKind::Input, Region::new(200, 100, 250, 500))
                .with_input_type("password"),
            Effect::Stay,
        )
        .candidate(
            "login",
            ElementCandidate::new("Sign in", ElementKind::Button, Region::new(300, 100, 350, 500)),
            Effect::Goto("dashboard"),
        );

    let result = explore(&app, fast_config());

    // Typing alone leaves the screen unchanged and still counts as visited
    assert_eq!(result.records[0].outcome, Outcome::NoChange);
    assert_eq!(visit_of(&result.site_map, 0, "Email").0, VisitState::VisitedOk);

    let submit = result
        .records
        .iter()
        .find(|r| r.element_label == "Sign in")
        .expect("submit attempted");
    assert_eq!(submit.outcome, Outcome::Navigated);
    assert_eq!(
        submit.actions,
        vec![
            Action::click(Region::new(100, 100, 150, 500)),
            Action::type_text(Region::new(100, 100, 150, 500), "user@example.com"),
            Action::click(Region::new(200, 100, 250, 500)),
            Action::type_text(Region::new(200, 100, 250, 500), "TestPass123!"),
            Action::click(Region::new(300, 100, 350, 500)),
        ]
    );
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_broken_replay_marks_screen_unreachable() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("wizard", "/wizard", 2)
        .element("home", "Start wizard", ElementKind::Button, Effect::GotoOnce("wizard"))
        .button("wizard", "Step A", Effect::Crash)
        .button("wizard", "Step B", Effect::Stay);

    let result = explore(&app, fast_config());

    assert_eq!(result.termination, Termination::Exhausted);
    let wizard = &result.site_map.screens[1];
    assert!(wizard.unreachable);
    assert_eq!(visit_of(&result.site_map, 1, "Step B").0, VisitState::Unvisited);
    assert!(!result.full_coverage());
}

#[test]
fn test_unidentifiable_result_is_skipped_without_record() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .button("home", "Render nothing", Effect::BlankSilent);

    let result = explore(&app, fast_config());

    assert!(result.records.is_empty());
    let (visit, note) = visit_of(&result.site_map, 0, "Render nothing");
    assert_eq!(visit, VisitState::Skipped);
    assert_eq!(note.as_deref(), Some("unidentifiable"));
    assert_eq!(result.steps_used, 1);
    assert_eq!(result.termination, Termination::Exhausted);
}

#[test]
fn test_dead_session_ends_in_error() {
    let app = two_screen_app();
    // Entry settle uses one wait; the first click finds the session dead
    app.die_after(1);

    let mut session = app.session();
    let mut explorer = Explorer::new(
        &mut session,
        &app,
        &RuleBasedDiagnosis,
        ENTRY,
        fast_config(),
        IdentityConfig::default(),
    );
    let state = explorer.run_to_end();

    assert_eq!(state, ExplorerState::Error);
    assert!(matches!(explorer.termination(), Some(Termination::Failed { .. })));
    assert!(explorer.records().is_empty());

    let result = explorer.into_result();
    assert!(!result.termination.completed());
    assert_eq!(result.site_map.screens.len(), 1);
    assert_eq!(result.stats().unvisited, 2);
}

#[test]
fn test_discovery_timeout_leaves_screen_partial() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .button("home", "Open menu", Effect::Stay)
        .discovery_timeouts("home", 1);

    let result = explore(&app, fast_config());

    let home = &result.site_map.screens[0];
    assert_eq!(home.discovery, DiscoveryStatus::Partial);
    assert!(home.elements.is_empty());
    assert_eq!(result.termination, Termination::Exhausted);
    assert!(!result.full_coverage());
}

#[test]
fn test_partial_screen_is_rediscovered_on_return() {
    let app = MockApp::new()
        .screen("home", "/", 1)
        .screen("details", "/details", 2)
        .element("home", "Open details", ElementKind::Link, Effect::Goto("details"))
        .element("home", "Details again", ElementKind::Link, Effect::Goto("details"))
        .element("details", "Back home", ElementKind::Link, Effect::Goto("home"))
        .discovery_timeouts("details", 1);

    let result = explore(&app, fast_config());

    let details = &result.site_map.screens[1];
    assert_eq!(details.discovery, DiscoveryStatus::Complete);
    assert_eq!(details.discovery_attempts, 2);
    assert_eq!(details.elements.len(), 1);
    assert_eq!(result.stats().unvisited, 0);
}

#[test]
fn test_cancel_before_start() {
    let app = two_screen_app();
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut session = app.session();
    let mut explorer = Explorer::new(
        &mut session,
        &app,
        &RuleBasedDiagnosis,
        ENTRY,
        fast_config(),
        IdentityConfig::default(),
    )
    .with_cancel(cancel);

    assert_eq!(explorer.step(), ExplorerState::Complete);
    assert_eq!(explorer.termination(), Some(&Termination::Cancelled));
    assert!(explorer.site_map().screens.is_empty());
    assert!(app.interactions().is_empty());
}

// ============================================================================
// Stepping and diagnosis
// ============================================================================

#[test]
fn test_step_by_step_states() {
    let app = two_screen_app();
    let mut session = app.session();
    let mut explorer = Explorer::new(
        &mut session,
        &app,
        &RuleBasedDiagnosis,
        ENTRY,
        fast_config(),
        IdentityConfig::default(),
    );

    assert_eq!(explorer.state(), ExplorerState::Idle);
    assert_eq!(explorer.step(), ExplorerState::Discovering);
    assert_eq!(explorer.current_screen(), Some(ScreenId(0)));
    assert_eq!(explorer.step(), ExplorerState::Selecting);
    assert_eq!(explorer.site_map().screens[0].elements.len(), 2);
    assert_eq!(explorer.step(), ExplorerState::Interacting);
    assert_eq!(explorer.steps_used(), 0);
    assert_eq!(explorer.step(), ExplorerState::Discovering);
    assert_eq!(explorer.steps_used(), 1);
    assert_eq!(explorer.current_screen(), Some(ScreenId(1)));
    assert_eq!(explorer.records().len(), 1);
}

#[test]
fn test_oracle_diagnosis_is_attached_to_failure() {
    let app = two_screen_app();
    let result = explore_with(
        &app,
        fast_config(),
        &FixedDiagnosis(IssueCategory::Performance, Severity::P1),
        4,
    );

    let diagnosis = result.records[1].diagnosis.as_ref().expect("failure diagnosed");
    assert_eq!(diagnosis.category, IssueCategory::Performance);
    assert_eq!(diagnosis.severity, Severity::P1);
    assert_eq!(result.records[1].cycle, 4);
    assert!(result.records[0].diagnosis.is_none());
}

#[test]
fn test_unavailable_oracle_falls_back_to_rules() {
    let app = two_screen_app();
    let result = explore_with(&app, fast_config(), &UnavailableDiagnosis, 1);

    let diagnosis = result.records[1].diagnosis.as_ref().expect("failure diagnosed");
    assert_eq!(diagnosis.category, IssueCategory::TechnicalError);
    assert_eq!(diagnosis.severity, Severity::P1);
    assert_eq!(
        diagnosis.suggested_fix.as_deref(),
        Some("Inspect server logs for the HTTP 500 response")
    );
}

// ============================================================================
// Input values
// ============================================================================

#[test]
fn test_field_type_classification() {
    assert_eq!(classify_field_type(Some("email"), "Contact"), FieldType::Email);
    assert_eq!(classify_field_type(None, "Password"), FieldType::Password);
    assert_eq!(classify_field_type(Some("text"), "Phone number"), FieldType::Tel);
    assert_eq!(classify_field_type(None, "Zip code"), FieldType::Postal);
    assert_eq!(classify_field_type(None, "Comment"), FieldType::Text);
}

#[test]
fn test_guess_value_per_field() {
    assert_eq!(guess_value("Email address", None), "user@example.com");
    assert_eq!(guess_value("Password", Some("password")), "TestPass123!");
    assert_eq!(guess_value("Username", None), "testuser");
    assert_eq!(guess_value("Quantity", Some("number")), "42");
    assert_eq!(guess_value("Notes", None), "test");
}

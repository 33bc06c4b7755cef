//! Scripted in-memory web application standing in for the browser session
//! and the vision oracle.
//!
//! Screens render as deterministic block patterns so the real fingerprint
//! code identifies them; elements carry an `Effect` applied when clicked.

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};

use screen_sentinel::alert::AlertSink;
use screen_sentinel::collab::{
    Action, BrowserSession, Diagnosis, DiagnosisContext, DiagnosisOracle, ElementCandidate,
    ElementDiscovery, SessionFactory, SideSignals, View,
};
use screen_sentinel::error::{ExplorerError, Result};
use screen_sentinel::explorer::{CycleResult, ExploreConfig, Explorer};
use screen_sentinel::identity::IdentityConfig;
use screen_sentinel::regression::{Issue, IssueCategory, RuleBasedDiagnosis, Severity};
use screen_sentinel::report::RunReport;
use screen_sentinel::sitemap::{ElementKind, Region};

pub const ENTRY: &str = "https://app.test/";

const SIDE: u32 = 128;
const BLOCK: u32 = 16;

// ============================================================================
// Screenshots
// ============================================================================

/// 128x128 grayscale PNG: 8x8 blocks, four bright blocks per row at a
/// seed-dependent rotation.
pub fn render_screen(seed: u64) -> Vec<u8> {
    encode(pattern(seed))
}

/// Same screen with a 3x3 pixel patch inverted (cursor blink, clock tick).
pub fn render_screen_with_noise(seed: u64) -> Vec<u8> {
    let mut img = pattern(seed);
    for y in 60..63 {
        for x in 60..63 {
            let Luma([v]) = *img.get_pixel(x, y);
            img.put_pixel(x, y, Luma([250 - v]));
        }
    }
    encode(img)
}

pub fn render_blank() -> Vec<u8> {
    encode(GrayImage::new(SIDE, SIDE))
}

fn pattern(seed: u64) -> GrayImage {
    let mut state = seed
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(0x2545_F491_4F6C_DD1D);
    if state == 0 {
        state = 1;
    }
    let mut rotations = [0u64; 8];
    for rotation in rotations.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *rotation = state % 8;
    }

    GrayImage::from_fn(SIDE, SIDE, |x, y| {
        let row = (y / BLOCK) as usize;
        let col = (x / BLOCK) as u64;
        let bright = (col + 8 - rotations[row]) % 8 < 4;
        Luma([if bright { 220 } else { 30 }])
    })
}

fn encode(img: GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("png encoding");
    bytes
}

// ============================================================================
// Application model
// ============================================================================

/// What clicking an element does to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Goto(&'static str),
    /// Navigates the first time only, then does nothing
    GotoOnce(&'static str),
    Stay,
    HttpError(u16),
    /// Render exception and a blank document
    Crash,
    /// Leaves for another site
    Offsite(&'static str),
    /// Blank document without any crash signal
    BlankSilent,
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub candidate: ElementCandidate,
    pub effect: Effect,
    pub clicks: u32,
}

#[derive(Debug, Clone)]
pub struct MockScreen {
    pub name: &'static str,
    pub url: String,
    pub image: Vec<u8>,
    pub elements: Vec<MockElement>,
    /// Screen shown after clicking the overlay backdrop
    pub dismiss_to: Option<&'static str>,
    pub visual_error: bool,
    /// Discovery calls that time out before the oracle answers
    pub discovery_timeouts: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum Position {
    Screen(&'static str),
    Offsite(String),
    Blank(String),
}

#[derive(Debug)]
struct World {
    screens: Vec<MockScreen>,
    position: Position,
    signals: SideSignals,
    actions: Vec<Action>,
    opened: u32,
    closed: u32,
    fail_open: bool,
    block_navigation: bool,
    die_after_actions: Option<usize>,
    discover_calls: u32,
}

impl World {
    fn screen(&self, name: &str) -> Option<&MockScreen> {
        self.screens.iter().find(|s| s.name == name)
    }

    fn screen_mut(&mut self, name: &str) -> Option<&mut MockScreen> {
        self.screens.iter_mut().find(|s| s.name == name)
    }

    fn current_url(&self) -> String {
        match &self.position {
            Position::Screen(name) => self.screen(name).map(|s| s.url.clone()).unwrap_or_default(),
            Position::Offsite(url) | Position::Blank(url) => url.clone(),
        }
    }

    fn navigate(&mut self, url: &str) {
        self.position = match self.screens.iter().find(|s| s.url == url) {
            Some(screen) => Position::Screen(screen.name),
            None => Position::Offsite(url.to_string()),
        };
    }

    fn click(&mut self, region: Region) {
        let Position::Screen(name) = self.position.clone() else {
            return;
        };
        let url = self.current_url();
        let Some(screen) = self.screen_mut(name) else {
            return;
        };

        if let Some(to) = screen.dismiss_to {
            if region == Region::new(0, 0, 20, 20) {
                self.position = Position::Screen(to);
                return;
            }
        }

        let Some(element) = screen.elements.iter_mut().find(|e| e.candidate.region == region) else {
            return;
        };
        element.clicks += 1;
        let clicks = element.clicks;

        match element.effect.clone() {
            Effect::Goto(to) => self.position = Position::Screen(to),
            Effect::GotoOnce(to) => {
                if clicks == 1 {
                    self.position = Position::Screen(to);
                }
            }
            Effect::Stay => {}
            Effect::HttpError(status) => self.signals.http_status = Some(status),
            Effect::Crash => {
                self.signals.render_exception = true;
                self.signals.blank_page = true;
                self.position = Position::Blank(url);
            }
            Effect::Offsite(to) => self.position = Position::Offsite(to.to_string()),
            Effect::BlankSilent => self.position = Position::Blank(url),
        }
    }

    fn view(&self) -> View {
        match &self.position {
            Position::Screen(name) => match self.screen(name) {
                Some(screen) => View::new(screen.image.clone(), &screen.url),
                None => View::new(render_blank(), ENTRY),
            },
            Position::Offsite(url) => View::new(render_screen(9_999), url),
            Position::Blank(url) => View::new(render_blank(), url),
        }
    }

    fn screen_for(&self, view: &View) -> Option<&MockScreen> {
        self.screens
            .iter()
            .find(|s| s.url == view.url && s.image == view.image)
    }
}

/// Shared handle on the scripted application. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct MockApp {
    world: Arc<Mutex<World>>,
}

impl Default for MockApp {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApp {
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(World {
                screens: Vec::new(),
                position: Position::Offsite(ENTRY.to_string()),
                signals: SideSignals::default(),
                actions: Vec::new(),
                opened: 0,
                closed: 0,
                fail_open: false,
                block_navigation: false,
                die_after_actions: None,
                discover_calls: 0,
            })),
        }
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().expect("mock world lock")
    }

    // ---- Builders ----

    /// Add a screen; `path` is appended to the entry origin.
    pub fn screen(self, name: &'static str, path: &str, seed: u64) -> Self {
        let url = format!("https://app.test{}", path);
        self.world().screens.push(MockScreen {
            name,
            url,
            image: render_screen(seed),
            elements: Vec::new(),
            dismiss_to: None,
            visual_error: false,
            discovery_timeouts: 0,
        });
        self
    }

    /// Add an element with an automatically assigned, non-overlapping region.
    pub fn element(self, screen: &'static str, label: &str, kind: ElementKind, effect: Effect) -> Self {
        let index = self
            .world()
            .screen(screen)
            .map(|s| s.elements.len() as u32)
            .unwrap_or(0);
        let region = Region::new(100 + 80 * index, 100, 150 + 80 * index, 500);
        self.candidate(screen, ElementCandidate::new(label, kind, region), effect)
    }

    pub fn button(self, screen: &'static str, label: &str, effect: Effect) -> Self {
        self.element(screen, label, ElementKind::Button, effect)
    }

    pub fn candidate(self, screen: &'static str, candidate: ElementCandidate, effect: Effect) -> Self {
        if let Some(s) = self.world().screen_mut(screen) {
            s.elements.push(MockElement {
                candidate,
                effect,
                clicks: 0,
            });
        }
        self
    }

    /// Make `screen` an overlay whose backdrop click leads to `to`.
    pub fn overlay(self, screen: &'static str, to: &'static str) -> Self {
        if let Some(s) = self.world().screen_mut(screen) {
            s.dismiss_to = Some(to);
            for e in &mut s.elements {
                e.candidate.in_overlay = true;
            }
        }
        self
    }

    pub fn visual_error_on(self, screen: &'static str) -> Self {
        if let Some(s) = self.world().screen_mut(screen) {
            s.visual_error = true;
        }
        self
    }

    pub fn discovery_timeouts(self, screen: &'static str, count: u32) -> Self {
        if let Some(s) = self.world().screen_mut(screen) {
            s.discovery_timeouts = count;
        }
        self
    }

    // ---- Mutation between cycles ----

    pub fn set_effect(&self, screen: &'static str, label: &str, effect: Effect) {
        let mut world = self.world();
        if let Some(e) = world
            .screen_mut(screen)
            .and_then(|s| s.elements.iter_mut().find(|e| e.candidate.label == label))
        {
            e.effect = effect;
        }
    }

    pub fn fail_open(&self, fail: bool) {
        self.world().fail_open = fail;
    }

    /// Make every URL load fail without killing the session.
    pub fn block_navigation(&self, block: bool) {
        self.world().block_navigation = block;
    }

    /// Kill the session once `count` actions were performed.
    pub fn die_after(&self, count: usize) {
        self.world().die_after_actions = Some(count);
    }

    // ---- Observation ----

    pub fn actions(&self) -> Vec<Action> {
        self.world().actions.clone()
    }

    /// Actions other than settle waits.
    pub fn interactions(&self) -> Vec<Action> {
        self.actions()
            .into_iter()
            .filter(|a| !matches!(a, Action::Wait { .. }))
            .collect()
    }

    pub fn opened(&self) -> u32 {
        self.world().opened
    }

    pub fn closed(&self) -> u32 {
        self.world().closed
    }

    pub fn discover_calls(&self) -> u32 {
        self.world().discover_calls
    }

    pub fn clicks(&self, screen: &'static str, label: &str) -> u32 {
        self.world()
            .screen(screen)
            .and_then(|s| s.elements.iter().find(|e| e.candidate.label == label))
            .map(|e| e.clicks)
            .unwrap_or(0)
    }

    pub fn region_of(&self, screen: &'static str, label: &str) -> Option<Region> {
        self.world()
            .screen(screen)
            .and_then(|s| s.elements.iter().find(|e| e.candidate.label == label))
            .map(|e| e.candidate.region)
    }

    pub fn view_of(&self, screen: &'static str) -> View {
        let world = self.world();
        let s = world.screen(screen).expect("screen declared");
        View::new(s.image.clone(), &s.url)
    }

    pub fn session(&self) -> MockSession {
        let mut world = self.world();
        world.navigate(ENTRY);
        world.signals = SideSignals::default();
        world.opened += 1;
        MockSession {
            world: Arc::clone(&self.world),
        }
    }
}

// ============================================================================
// Collaborator implementations
// ============================================================================

pub struct MockSession {
    world: Arc<Mutex<World>>,
}

impl BrowserSession for MockSession {
    fn capture(&mut self) -> Result<View> {
        let world = self.world.lock().expect("mock world lock");
        Ok(world.view())
    }

    fn act(&mut self, action: &Action) -> Result<()> {
        let mut world = self.world.lock().expect("mock world lock");
        if world
            .die_after_actions
            .is_some_and(|limit| world.actions.len() >= limit)
        {
            return Err(ExplorerError::session_dead("browser process exited"));
        }
        if world.block_navigation && matches!(action, Action::Navigate { .. }) {
            return Err(ExplorerError::actuator("navigation timed out"));
        }
        world.actions.push(action.clone());
        match action {
            Action::Click { region } => world.click(*region),
            Action::Navigate { url } => world.navigate(url),
            _ => {}
        }
        Ok(())
    }

    fn take_signals(&mut self) -> SideSignals {
        let mut world = self.world.lock().expect("mock world lock");
        std::mem::take(&mut world.signals)
    }

    fn close(&mut self) -> Result<()> {
        self.world.lock().expect("mock world lock").closed += 1;
        Ok(())
    }
}

impl SessionFactory for MockApp {
    fn open(&mut self, _entry_url: &str) -> Result<Box<dyn BrowserSession>> {
        if self.world().fail_open {
            return Err(ExplorerError::actuator("browser failed to launch"));
        }
        Ok(Box::new(self.session()))
    }
}

impl ElementDiscovery for MockApp {
    fn discover(&self, view: &View) -> Result<Vec<ElementCandidate>> {
        let mut world = self.world();
        world.discover_calls += 1;
        let Some(name) = world.screen_for(view).map(|s| s.name) else {
            return Ok(Vec::new());
        };
        let screen = world.screen_mut(name).expect("screen just found");
        if screen.discovery_timeouts > 0 {
            screen.discovery_timeouts -= 1;
            return Err(ExplorerError::oracle_timeout("element discovery"));
        }
        Ok(screen.elements.iter().map(|e| e.candidate.clone()).collect())
    }

    fn visual_error(&self, view: &View) -> Result<bool> {
        Ok(self.world().screen_for(view).is_some_and(|s| s.visual_error))
    }
}

/// Diagnosis oracle answering with a fixed category and severity.
pub struct FixedDiagnosis(pub IssueCategory, pub Severity);

impl DiagnosisOracle for FixedDiagnosis {
    fn diagnose(&self, _view: &View, context: &DiagnosisContext) -> Result<Diagnosis> {
        Ok(Diagnosis {
            category: self.0,
            severity: self.1,
            description: format!("oracle: {}", context.describe()),
            suggested_fix: Some("ask the oracle".to_string()),
        })
    }
}

pub struct UnavailableDiagnosis;

impl DiagnosisOracle for UnavailableDiagnosis {
    fn diagnose(&self, _view: &View, _context: &DiagnosisContext) -> Result<Diagnosis> {
        Err(ExplorerError::oracle_timeout("diagnosis"))
    }
}

/// Alert sink keeping every delivered issue and cycle summary.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<Issue>>>,
    summaries: Arc<Mutex<Vec<RunReport>>>,
}

impl RecordingSink {
    pub fn received(&self) -> Vec<Issue> {
        self.received.lock().expect("sink lock").clone()
    }

    pub fn summaries(&self) -> Vec<RunReport> {
        self.summaries.lock().expect("sink lock").clone()
    }
}

impl AlertSink for RecordingSink {
    fn notify(&self, issue: &Issue) -> Result<()> {
        self.received.lock().expect("sink lock").push(issue.clone());
        Ok(())
    }

    fn notify_summary(&self, report: &RunReport) -> Result<()> {
        self.summaries.lock().expect("sink lock").push(report.clone());
        Ok(())
    }
}

pub struct FailingSink;

impl AlertSink for FailingSink {
    fn notify(&self, _issue: &Issue) -> Result<()> {
        Err(ExplorerError::Alert("channel refused the message".to_string()))
    }

    fn notify_summary(&self, _report: &RunReport) -> Result<()> {
        Err(ExplorerError::Alert("channel refused the summary".to_string()))
    }
}

// ============================================================================
// Scenarios and runners
// ============================================================================

pub fn fast_config() -> ExploreConfig {
    ExploreConfig {
        settle_delay_ms: 0,
        settle_attempts: 2,
        ..ExploreConfig::default()
    }
}

/// Home screen with a working link to details and a button answering 500.
pub fn two_screen_app() -> MockApp {
    MockApp::new()
        .screen("home", "/", 1)
        .screen("details", "/details", 2)
        .element("home", "Open details", ElementKind::Link, Effect::Goto("details"))
        .button("home", "Delete item", Effect::HttpError(500))
}

pub fn explore(app: &MockApp, config: ExploreConfig) -> CycleResult {
    explore_with(app, config, &RuleBasedDiagnosis, 1)
}

pub fn explore_with(
    app: &MockApp,
    config: ExploreConfig,
    diagnosis: &dyn DiagnosisOracle,
    cycle: u64,
) -> CycleResult {
    let mut session = app.session();
    let mut explorer = Explorer::new(
        &mut session,
        app,
        diagnosis,
        ENTRY,
        config,
        IdentityConfig::default(),
    )
    .with_cycle("test-run", cycle);
    explorer.run_to_end();
    explorer.into_result()
}

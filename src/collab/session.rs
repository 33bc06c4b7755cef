use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sitemap::Region;

/// One captured view of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// Encoded screenshot (PNG)
    #[serde(skip)]
    pub image: Vec<u8>,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl View {
    pub fn new(image: Vec<u8>, url: &str) -> Self {
        Self {
            image,
            url: url.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Action dispatched to the actuator. Regions use the oracle's per-mille
/// scale; the actuator converts them to viewport pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Click { region: Region },
    Type { region: Region, text: String },
    /// Scroll until `region` is inside the viewport
    Scroll { region: Region },
    Wait { duration_ms: u64 },
    /// Load a URL directly (session reset during recovery)
    Navigate { url: String },
}

impl Action {
    pub fn click(region: Region) -> Self {
        Action::Click { region }
    }

    pub fn type_text(region: Region, text: &str) -> Self {
        Action::Type {
            region,
            text: text.to_string(),
        }
    }

    pub fn wait(duration_ms: u64) -> Self {
        Action::Wait { duration_ms }
    }

    pub fn navigate(url: &str) -> Self {
        Action::Navigate {
            url: url.to_string(),
        }
    }
}

/// Side-channel observations collected around one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideSignals {
    /// Worst 4xx/5xx status correlated with the action, if any
    #[serde(default)]
    pub http_status: Option<u16>,

    /// Uncaught render/script exception reported by the page
    #[serde(default)]
    pub render_exception: bool,

    /// Document rendered empty
    #[serde(default)]
    pub blank_page: bool,

    /// Oracle saw an error message on the resulting view
    #[serde(default)]
    pub visual_error: bool,
}

impl SideSignals {
    pub fn crashed(&self) -> bool {
        self.render_exception || self.blank_page
    }

    pub fn http_error(&self) -> bool {
        self.http_status.is_some_and(|s| s >= 400)
    }

    /// Combine two observation windows, keeping the worst status.
    pub fn merge(self, other: SideSignals) -> SideSignals {
        SideSignals {
            http_status: match (self.http_status, other.http_status) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
            render_exception: self.render_exception || other.render_exception,
            blank_page: self.blank_page || other.blank_page,
            visual_error: self.visual_error || other.visual_error,
        }
    }
}

/// A live browser session: capture plus actuator.
///
/// Exactly one action is in flight at a time; every call blocks until the
/// browser has answered or the session's own timeout expired.
pub trait BrowserSession {
    /// Capture the current view. No side effects on the application.
    fn capture(&mut self) -> Result<View>;

    /// Perform an action. Fails with `ExplorerError::Actuator`; `fatal` is
    /// set when the session is dead.
    fn act(&mut self, action: &Action) -> Result<()>;

    /// Signals observed since the previous call.
    fn take_signals(&mut self) -> SideSignals;

    fn close(&mut self) -> Result<()>;
}

/// Opens fresh sessions, one per exploration cycle, positioned on the entry URL.
pub trait SessionFactory {
    fn open(&mut self, entry_url: &str) -> Result<Box<dyn BrowserSession>>;
}

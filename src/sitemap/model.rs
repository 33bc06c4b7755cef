use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::ScreenSignature;
use crate::outcome::Outcome;

// ============================================================================
// Arena keys
// ============================================================================

/// Index of a screen inside its `SiteMap`. Stable for the lifetime of the
/// map and across serialization, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(pub usize);

/// Index of an element inside its owning screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

// ============================================================================
// Element model
// ============================================================================

/// Bounding box on the oracle's 0-1000 per-mille scale, relative to the
/// viewport. `ymin >= 1000` means the element starts below the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub ymin: u32,
    pub xmin: u32,
    pub ymax: u32,
    pub xmax: u32,
}

impl Region {
    pub fn new(ymin: u32, xmin: u32, ymax: u32, xmax: u32) -> Self {
        Self { ymin, xmin, ymax, xmax }
    }

    fn area(&self) -> u64 {
        self.ymax.saturating_sub(self.ymin) as u64 * self.xmax.saturating_sub(self.xmin) as u64
    }

    /// Intersection over union of two regions.
    pub fn iou(&self, other: &Region) -> f32 {
        let top = self.ymin.max(other.ymin);
        let left = self.xmin.max(other.xmin);
        let bottom = self.ymax.min(other.ymax);
        let right = self.xmax.min(other.xmax);

        if bottom <= top || right <= left {
            // Degenerate boxes only match themselves
            return if self == other { 1.0 } else { 0.0 };
        }

        let inter = (bottom - top) as u64 * (right - left) as u64;
        let union = self.area() + other.area() - inter;
        if union == 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }

    pub fn is_below_fold(&self) -> bool {
        self.ymin >= 1000
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    Link,
    Input,
    Dropdown,
    Toggle,
    Tab,
    Other,
}

/// Oracle's priority hint. Ordering puts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitState {
    #[default]
    Unvisited,
    VisitedOk,
    VisitedError,
    Skipped,
}

/// Identity of an element within its screen: normalized label, kind and
/// approximate region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementKey {
    pub label: String,
    pub kind: ElementKind,
    pub region: Region,
}

impl ElementKey {
    pub fn new(label: &str, kind: ElementKind, region: Region) -> Self {
        Self {
            label: normalize_label(label),
            kind,
            region,
        }
    }

    pub fn matches(&self, other: &ElementKey, region_iou: f32) -> bool {
        self.label == other.label && self.kind == other.kind && self.region.iou(&other.region) >= region_iou
    }
}

/// Lowercase and collapse whitespace so oracle wording noise does not split
/// one element into two.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// An interactive element discovered on a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,

    /// Oracle-provided description, as reported
    pub label: String,

    pub kind: ElementKind,
    pub region: Region,
    pub priority: Priority,

    /// Declared field type for inputs (email, password, ...)
    #[serde(default)]
    pub input_type: Option<String>,

    /// Where a link points, when the oracle could tell
    #[serde(default)]
    pub target_url: Option<String>,

    /// Inserted by the explorer rather than reported by the oracle
    #[serde(default)]
    pub synthetic: bool,

    pub visit: VisitState,

    /// Why the element ended in its visit state ("unresponsive", "off-domain", ...)
    #[serde(default)]
    pub note: Option<String>,

    /// Interaction attempts made this cycle
    #[serde(default)]
    pub attempts: u32,

    #[serde(default)]
    pub last_outcome: Option<Outcome>,
}

impl Element {
    pub fn key(&self) -> ElementKey {
        ElementKey::new(&self.label, self.kind, self.region)
    }

    pub fn is_unvisited(&self) -> bool {
        self.visit == VisitState::Unvisited
    }
}

// ============================================================================
// Screen and transition model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    #[default]
    Pending,
    Complete,
    /// The oracle failed; the element list may be incomplete
    Partial,
}

/// A distinct state of the application's view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: ScreenId,
    pub signature: ScreenSignature,

    /// URL as captured, before normalization
    pub raw_url: String,

    pub elements: Vec<Element>,

    /// Cycle number in which the screen was first seen
    pub first_seen_cycle: u64,
    pub discovered_at: DateTime<Utc>,

    /// Modal or overlay covering another screen
    #[serde(default)]
    pub overlay: bool,

    #[serde(default)]
    pub discovery: DiscoveryStatus,
    #[serde(default)]
    pub discovery_attempts: u32,

    /// Scroll-extend actions spent reaching below-the-fold elements
    #[serde(default)]
    pub scroll_extends: u32,

    /// Recovery could not reach this screen during the cycle
    #[serde(default)]
    pub unreachable: bool,
}

impl Screen {
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn has_unvisited(&self) -> bool {
        self.elements.iter().any(Element::is_unvisited)
    }

    pub fn find_element(&self, key: &ElementKey, region_iou: f32) -> Option<&Element> {
        self.elements.iter().find(|e| e.key().matches(key, region_iou))
    }
}

/// Directed edge `(from, element) -> to`, recorded the first time the
/// interaction lands on `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: ScreenId,
    pub element: ElementId,
    pub to: ScreenId,
    pub recorded_at: DateTime<Utc>,
}

/// Coverage bookkeeping over the whole map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageStats {
    pub screens: usize,
    pub transitions: usize,
    pub elements_total: usize,
    pub visited_ok: usize,
    pub visited_error: usize,
    pub skipped: usize,
    pub unvisited: usize,
}

impl CoverageStats {
    /// Elements no longer `unvisited`.
    pub fn elements_visited(&self) -> usize {
        self.visited_ok + self.visited_error + self.skipped
    }

    /// Fraction (0.0..=1.0) of elements no longer `unvisited`; 0 for an empty map.
    pub fn coverage(&self) -> f64 {
        if self.elements_total == 0 {
            return 0.0;
        }
        self.elements_visited() as f64 / self.elements_total as f64
    }

    pub fn coverage_percent(&self) -> f64 {
        (self.coverage() * 1000.0).round() / 10.0
    }
}

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collab::View;

use super::fingerprint::{Fingerprint, compute_fingerprint};
use super::normalize::normalize_url;

/// Tolerances used to decide whether two captures show the same screen and
/// whether two oracle-reported elements are the same element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Minimum fingerprint similarity (0.0..=1.0) for two captures to match
    #[serde(default = "default_similarity")]
    pub similarity_threshold: f32,

    /// Minimum bounding-region IoU for two elements to be the same element
    #[serde(default = "default_region_iou")]
    pub region_iou: f32,

    /// Query parameters that stay part of the normalized URL
    #[serde(default)]
    pub query_allow_list: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity(),
            region_iou: default_region_iou(),
            query_allow_list: Vec::new(),
        }
    }
}

fn default_similarity() -> f32 { 0.96 }
fn default_region_iou() -> f32 { 0.8 }

/// Comparable identity of a known screen: fingerprint plus normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSignature {
    pub fingerprint: Fingerprint,
    pub url: String,
}

impl ScreenSignature {
    /// Same screen iff URLs are equal and fingerprints are similar enough.
    /// URL wins over the visual hash: equal hashes on different URLs are
    /// different screens.
    pub fn matches(&self, other: &ScreenSignature, threshold: f32) -> bool {
        self.url == other.url && self.fingerprint.similarity(&other.fingerprint) >= threshold
    }
}

/// Result of identifying a captured view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenKey {
    Known(ScreenSignature),
    /// Fingerprinting failed; never a new screen
    Unknown,
}

impl ScreenKey {
    pub fn signature(&self) -> Option<&ScreenSignature> {
        match self {
            ScreenKey::Known(sig) => Some(sig),
            ScreenKey::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ScreenKey::Unknown)
    }

    /// Two keys denote the same screen. `Unknown` never matches anything,
    /// including another `Unknown`.
    pub fn same_screen(&self, other: &ScreenKey, threshold: f32) -> bool {
        match (self, other) {
            (ScreenKey::Known(a), ScreenKey::Known(b)) => a.matches(b, threshold),
            _ => false,
        }
    }
}

/// Turn a captured view into a comparable screen key.
pub fn identify(view: &View, config: &IdentityConfig) -> ScreenKey {
    match compute_fingerprint(&view.image) {
        Ok(fingerprint) => ScreenKey::Known(ScreenSignature {
            fingerprint,
            url: normalize_url(&view.url, &config.query_allow_list),
        }),
        Err(e) => {
            debug!(url = %view.url, error = %e, "capture could not be fingerprinted");
            ScreenKey::Unknown
        }
    }
}

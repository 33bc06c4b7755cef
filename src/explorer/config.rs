use serde::{Deserialize, Serialize};

/// Per-cycle exploration limits and pacing.
///
/// Every field has a default, so a partial `explore:` section in the
/// config file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreConfig {
    /// Interaction attempts allowed per cycle (default 200)
    #[serde(default = "default_step_budget")]
    pub step_budget: u32,

    /// Wall-clock limit per cycle in seconds (default 3600)
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,

    /// Consecutive `no_change` attempts before an element is unresponsive (default 2)
    #[serde(default = "default_unresponsive_after")]
    pub unresponsive_after: u32,

    /// Scroll-extend actions allowed per screen (default 3)
    #[serde(default = "default_max_scroll_extends")]
    pub max_scroll_extends: u32,

    /// Delay between settle checks after an action (default 500)
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Settle checks before accepting the latest capture (default 3)
    #[serde(default = "default_settle_attempts")]
    pub settle_attempts: u32,

    /// Discovery passes per screen and cycle when the oracle times out (default 2)
    #[serde(default = "default_max_discovery_attempts")]
    pub max_discovery_attempts: u32,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            step_budget: default_step_budget(),
            time_budget_secs: default_time_budget(),
            unresponsive_after: default_unresponsive_after(),
            max_scroll_extends: default_max_scroll_extends(),
            settle_delay_ms: default_settle_delay(),
            settle_attempts: default_settle_attempts(),
            max_discovery_attempts: default_max_discovery_attempts(),
        }
    }
}

fn default_step_budget() -> u32 { 200 }
fn default_time_budget() -> u64 { 3600 }
fn default_unresponsive_after() -> u32 { 2 }
fn default_max_scroll_extends() -> u32 { 3 }
fn default_settle_delay() -> u64 { 500 }
fn default_settle_attempts() -> u32 { 3 }
fn default_max_discovery_attempts() -> u32 { 2 }

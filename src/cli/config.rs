use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertDispatcher, AlertSink, LogSink, TeamsSink, WebhookSink};
use crate::coordinator::RunSettings;
use crate::error::Result;
use crate::explorer::ExploreConfig;
use crate::identity::IdentityConfig;
use crate::regression::Severity;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "screen-sentinel",
    version,
    about = "Continuous exploration and regression detection for web applications"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: screen-sentinel.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the stored baseline and latest run report of an entry point
    Inspect {
        /// Entry URL the baseline was recorded for
        #[arg(long)]
        entry: String,

        /// Store directory (default: run.store_dir from config)
        #[arg(long)]
        store: Option<String>,
    },

    /// Diff two baseline files and show which issues would alert
    Diff {
        /// Earlier baseline JSON file
        #[arg(long)]
        previous: String,

        /// Later baseline JSON file
        #[arg(long)]
        current: String,
    },

    /// Summarize the interaction history of an entry point
    History {
        /// Entry URL the history was recorded for
        #[arg(long)]
        entry: String,

        /// Store directory (default: run.store_dir from config)
        #[arg(long)]
        store: Option<String>,

        /// Only list interactions that ended in error or crash
        #[arg(long)]
        failures_only: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `screen-sentinel.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub explore: ExploreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// Payload style of the incoming webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    /// `{"text": ...}`, accepted by Slack and compatible chat tools
    #[default]
    Slack,
    /// Adaptive Card message for a Microsoft Teams channel
    Teams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Incoming webhook; alerts are only logged when unset
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub webhook_format: WebhookFormat,

    /// Least severe issue that still alerts (default P2)
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,

    /// Send a summary after every cycle (default true)
    #[serde(default = "default_cycle_summary")]
    pub cycle_summary: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_format: WebhookFormat::default(),
            min_severity: default_min_severity(),
            cycle_summary: default_cycle_summary(),
        }
    }
}

impl AlertConfig {
    /// Dispatcher posting to the webhook, or logging alerts when none is set.
    pub fn dispatcher(&self) -> Result<AlertDispatcher> {
        let sink: Box<dyn AlertSink> = match (&self.webhook_url, self.webhook_format) {
            (Some(url), WebhookFormat::Slack) => Box::new(WebhookSink::new(url)?),
            (Some(url), WebhookFormat::Teams) => Box::new(TeamsSink::new(url)?),
            (None, _) => Box::new(LogSink),
        };
        Ok(AlertDispatcher::spawn(sink, self.min_severity).with_summaries(self.cycle_summary))
    }
}

// Serde default helpers
fn default_min_severity() -> Severity { Severity::P2 }
fn default_cycle_summary() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "screen-sentinel.yaml";

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content),
        Err(_) => AppConfig::default(),
    }
}

/// Parse YAML config text, falling back to defaults when malformed.
pub fn parse_config(content: &str) -> AppConfig {
    match serde_yaml::from_str(content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "malformed config, using defaults");
            AppConfig::default()
        }
    }
}

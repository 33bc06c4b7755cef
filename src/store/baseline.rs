use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ExplorerError, Result};
use crate::explorer::CycleResult;
use crate::regression::Issue;
use crate::report::RunReport;
use crate::sitemap::SiteMap;

/// On-disk format version of `Baseline`.
pub const BASELINE_VERSION: u32 = 1;

/// Site map and issue set of the latest completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub version: u32,
    pub entry_url: String,
    pub run_id: String,
    pub cycle: u64,
    pub created_at: DateTime<Utc>,

    /// The cycle dealt with every discovered element
    pub full_coverage: bool,

    pub site_map: SiteMap,

    /// Every issue of the cycle, alerted or suppressed
    pub issues: Vec<Issue>,
}

impl Baseline {
    pub fn from_cycle(entry_url: &str, result: &CycleResult, issues: Vec<Issue>) -> Self {
        Self {
            version: BASELINE_VERSION,
            entry_url: entry_url.to_string(),
            run_id: result.run_id.clone(),
            cycle: result.cycle,
            created_at: Utc::now(),
            full_coverage: result.full_coverage(),
            site_map: result.site_map.clone(),
            issues,
        }
    }
}

/// Persistence of baselines and run reports, keyed by entry URL.
///
/// A missing baseline is the normal first-run condition (`Ok(None)`).
pub trait BaselineStore {
    fn load_baseline(&self, entry_url: &str) -> Result<Option<Baseline>>;

    /// Publish a new baseline, keeping the one it replaces as the prior generation.
    fn save_baseline(&self, baseline: &Baseline) -> Result<()>;

    fn save_report(&self, report: &RunReport) -> Result<()>;

    fn latest_report(&self, entry_url: &str) -> Result<Option<RunReport>>;

    /// Issues alerted by cycles that ended without publishing a baseline.
    /// A missing ledger is empty.
    fn load_pending_alerts(&self, entry_url: &str) -> Result<Vec<Issue>>;

    /// Replace the pending-alert ledger; an empty slice clears it.
    fn save_pending_alerts(&self, entry_url: &str, issues: &[Issue]) -> Result<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Directory layout, one subdirectory per entry URL:
///
/// ```text
/// <root>/<sha1(entry_url)>/baseline.json
///                          baseline.prev.json
///                          alerted.json
///                          report.json
///                          reports/cycle-<n>.json
///                          interactions.jsonl
/// ```
#[derive(Debug, Clone)]
pub struct FileBaselineStore {
    root: PathBuf,
}

impl FileBaselineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, entry_url: &str) -> PathBuf {
        self.root.join(entry_key(entry_url))
    }

    pub fn baseline_path(&self, entry_url: &str) -> PathBuf {
        self.entry_dir(entry_url).join("baseline.json")
    }

    pub fn previous_baseline_path(&self, entry_url: &str) -> PathBuf {
        self.entry_dir(entry_url).join("baseline.prev.json")
    }

    pub fn pending_alerts_path(&self, entry_url: &str) -> PathBuf {
        self.entry_dir(entry_url).join("alerted.json")
    }

    pub fn report_path(&self, entry_url: &str) -> PathBuf {
        self.entry_dir(entry_url).join("report.json")
    }

    pub fn history_path(&self, entry_url: &str) -> PathBuf {
        self.entry_dir(entry_url).join("interactions.jsonl")
    }

    /// The generation replaced by the latest `save_baseline`.
    pub fn load_previous_generation(&self, entry_url: &str) -> Result<Option<Baseline>> {
        read_baseline(&self.previous_baseline_path(entry_url))
    }
}

impl BaselineStore for FileBaselineStore {
    fn load_baseline(&self, entry_url: &str) -> Result<Option<Baseline>> {
        let path = self.baseline_path(entry_url);
        match read_baseline(&path) {
            Ok(found) => Ok(found),
            Err(e) => {
                // A torn or foreign file falls back to the prior generation
                warn!(path = %path.display(), error = %e, "baseline unreadable, trying prior generation");
                self.load_previous_generation(entry_url)
            }
        }
    }

    fn save_baseline(&self, baseline: &Baseline) -> Result<()> {
        let path = self.baseline_path(&baseline.entry_url);
        let data = serde_json::to_vec_pretty(baseline)?;

        // Only a readable generation may replace the prior one
        match read_baseline(&path) {
            Ok(Some(_)) => {
                let current = fs::read(&path).map_err(persistence(&path))?;
                let prev = self.previous_baseline_path(&baseline.entry_url);
                write_atomic(&prev, &current).map_err(persistence(&prev))?;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "current baseline unreadable, prior generation kept");
            }
        }
        write_atomic(&path, &data).map_err(persistence(&path))?;

        info!(
            path = %path.display(),
            cycle = baseline.cycle,
            screens = baseline.site_map.screen_count(),
            issues = baseline.issues.len(),
            "baseline published"
        );
        Ok(())
    }

    fn save_report(&self, report: &RunReport) -> Result<()> {
        let data = serde_json::to_vec_pretty(report)?;
        let dir = self.entry_dir(&report.entry_url);
        let archived = dir.join("reports").join(format!("cycle-{}.json", report.cycle));
        write_atomic(&archived, &data).map_err(persistence(&archived))?;

        let latest = self.report_path(&report.entry_url);
        write_atomic(&latest, &data).map_err(persistence(&latest))?;
        debug!(path = %latest.display(), cycle = report.cycle, "run report written");
        Ok(())
    }

    fn latest_report(&self, entry_url: &str) -> Result<Option<RunReport>> {
        read_json(&self.report_path(entry_url))
    }

    fn load_pending_alerts(&self, entry_url: &str) -> Result<Vec<Issue>> {
        Ok(read_json(&self.pending_alerts_path(entry_url))?.unwrap_or_default())
    }

    fn save_pending_alerts(&self, entry_url: &str, issues: &[Issue]) -> Result<()> {
        let path = self.pending_alerts_path(entry_url);
        if issues.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(persistence(&path)(e)),
            };
        }
        let data = serde_json::to_vec_pretty(issues)?;
        write_atomic(&path, &data).map_err(persistence(&path))?;
        debug!(path = %path.display(), pending = issues.len(), "pending alerts written");
        Ok(())
    }
}

/// Stable directory name for an entry URL.
pub fn entry_key(entry_url: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(entry_url.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn read_baseline(path: &Path) -> Result<Option<Baseline>> {
    let Some(baseline) = read_json::<Baseline>(path)? else {
        return Ok(None);
    };
    if baseline.version != BASELINE_VERSION {
        return Err(ExplorerError::Persistence(format!(
            "{} has baseline version {}, expected {}",
            path.display(),
            baseline.version,
            BASELINE_VERSION
        )));
    }
    debug!(path = %path.display(), cycle = baseline.cycle, "baseline loaded");
    Ok(Some(baseline))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(persistence(path)(e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| ExplorerError::Persistence(format!("parse {}: {}", path.display(), e)))
}

fn persistence(path: &Path) -> impl Fn(io::Error) -> ExplorerError + '_ {
    move |e| ExplorerError::Persistence(format!("{}: {}", path.display(), e))
}

/// Write to a sibling temp file, sync, then rename over `path`; readers see
/// either the old or the new content.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)
}

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::config::AppConfig;
use crate::error::{ExplorerError, Result};
use crate::regression::{IssueKind, compare, dedupe, failures_of};
use crate::report::{format_console_report, format_history, format_issue_list};
use crate::store::{BASELINE_VERSION, Baseline, BaselineStore, FileBaselineStore, InteractionLog};

fn store_for(config: &AppConfig, store: Option<&str>) -> FileBaselineStore {
    let dir = store
        .map(PathBuf::from)
        .unwrap_or_else(|| config.run.store_dir.clone());
    FileBaselineStore::new(dir)
}

// ============================================================================
// inspect subcommand
// ============================================================================

pub fn cmd_inspect(config: &AppConfig, entry: &str, store: Option<&str>) -> Result<()> {
    let store = store_for(config, store);

    match store.load_baseline(entry)? {
        Some(baseline) => {
            let stats = baseline.site_map.coverage_stats();
            println!("Baseline for {} (cycle {}, run {})", entry, baseline.cycle, baseline.run_id);
            println!(
                "  {} screens, {} transitions, coverage {:.1}%{}",
                stats.screens,
                stats.transitions,
                stats.coverage_percent(),
                if baseline.full_coverage { " (full)" } else { "" }
            );
            for screen in &baseline.site_map.screens {
                let visited = screen.elements.iter().filter(|e| !e.is_unvisited()).count();
                println!(
                    "  [{}] {} {} ({}/{} elements){}",
                    screen.id.0,
                    screen.signature.fingerprint.short(),
                    screen.raw_url,
                    visited,
                    screen.elements.len(),
                    if screen.overlay { " overlay" } else { "" }
                );
            }
            println!("  {} issues on record", baseline.issues.len());
        }
        None => println!("No baseline recorded for {}", entry),
    }

    if let Some(report) = store.latest_report(entry)? {
        println!();
        print!("{}", format_console_report(&report));
    }
    Ok(())
}

// ============================================================================
// diff subcommand
// ============================================================================

pub fn cmd_diff(config: &AppConfig, previous: &str, current: &str) -> Result<()> {
    let before = read_baseline_file(Path::new(previous))?;
    let after = read_baseline_file(Path::new(current))?;

    let issues = compare(
        Some(&before),
        &after.site_map,
        after.full_coverage,
        after.cycle,
        failures_of(&after.issues),
        &config.identity,
    );
    let deduped = dedupe(&before.issues, issues, &config.identity);

    let regressions = deduped
        .alert
        .iter()
        .chain(deduped.suppressed.iter())
        .filter(|i| i.kind == IssueKind::Regression)
        .count();
    println!(
        "Cycle {} -> {}: {} regression{}",
        before.cycle,
        after.cycle,
        regressions,
        if regressions == 1 { "" } else { "s" }
    );
    print!("{}", format_issue_list(&deduped.alert, &deduped.suppressed));
    Ok(())
}

fn read_baseline_file(path: &Path) -> Result<Baseline> {
    let contents = fs::read_to_string(path)?;
    let baseline: Baseline = serde_json::from_str(&contents)?;
    if baseline.version != BASELINE_VERSION {
        return Err(ExplorerError::Persistence(format!(
            "{} has baseline version {}, expected {}",
            path.display(),
            baseline.version,
            BASELINE_VERSION
        )));
    }
    Ok(baseline)
}

// ============================================================================
// history subcommand
// ============================================================================

pub fn cmd_history(config: &AppConfig, entry: &str, store: Option<&str>, failures_only: bool) -> Result<()> {
    let store = store_for(config, store);
    let path = store.history_path(entry);
    let records = InteractionLog::read_all(&path)?;
    if records.is_empty() {
        println!("No interactions recorded for {}", entry);
        return Ok(());
    }
    print!("{}", format_history(&records, failures_only));
    Ok(())
}

// ============================================================================
// config subcommand
// ============================================================================

pub fn cmd_config(config: &AppConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

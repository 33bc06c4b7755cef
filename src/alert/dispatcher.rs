use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::regression::{Issue, Severity};
use crate::report::RunReport;

use super::sink::AlertSink;

/// Delivery counters shared with the dispatcher thread.
#[derive(Debug, Default)]
pub struct AlertStats {
    pub delivered: AtomicU64,
    pub failed: AtomicU64,
}

enum Delivery {
    Issue(Issue),
    Summary(Box<RunReport>),
}

impl Delivery {
    fn describe(&self) -> String {
        match self {
            Delivery::Issue(issue) => issue.headline(),
            Delivery::Summary(report) => format!("cycle {} summary", report.cycle),
        }
    }
}

/// Fire-and-forget alert delivery on a background thread.
///
/// `notify` only enqueues; sink failures are logged and counted, never
/// returned to the caller. Dropping the dispatcher drains the queue.
pub struct AlertDispatcher {
    sender: Option<Sender<Delivery>>,
    worker: Option<JoinHandle<()>>,
    min_severity: Severity,
    summaries: bool,
    stats: Arc<AlertStats>,
}

impl AlertDispatcher {
    /// Start the delivery thread. Issues less severe than `min_severity`
    /// are dropped at `notify`. Cycle summaries are sent unless disabled
    /// with `with_summaries(false)`.
    pub fn spawn(sink: Box<dyn AlertSink>, min_severity: Severity) -> Self {
        let (sender, receiver) = mpsc::channel::<Delivery>();
        let stats = Arc::new(AlertStats::default());
        let worker_stats = Arc::clone(&stats);

        let worker = thread::spawn(move || {
            for delivery in receiver {
                let sent = match &delivery {
                    Delivery::Issue(issue) => sink.notify(issue),
                    Delivery::Summary(report) => sink.notify_summary(report),
                };
                match sent {
                    Ok(()) => {
                        worker_stats.delivered.fetch_add(1, Ordering::Relaxed);
                        debug!(alert = %delivery.describe(), "alert delivered");
                    }
                    Err(e) => {
                        worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(alert = %delivery.describe(), error = %e, "alert delivery failed");
                    }
                }
            }
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
            min_severity,
            summaries: true,
            stats,
        }
    }

    pub fn with_summaries(mut self, enabled: bool) -> Self {
        self.summaries = enabled;
        self
    }

    /// Queue an issue for delivery. Returns whether it was queued.
    pub fn notify(&self, issue: Issue) -> bool {
        if issue.severity > self.min_severity {
            debug!(issue = %issue.headline(), "below alert threshold");
            return false;
        }
        self.enqueue(Delivery::Issue(issue))
    }

    /// Queue the end-of-cycle summary. Summaries ignore the severity
    /// threshold so a clean cycle is reported too.
    pub fn notify_summary(&self, report: &RunReport) -> bool {
        if !self.summaries {
            return false;
        }
        self.enqueue(Delivery::Summary(Box::new(report.clone())))
    }

    fn enqueue(&self, delivery: Delivery) -> bool {
        match &self.sender {
            Some(sender) => match sender.send(delivery) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "alert thread gone, alert dropped");
                    false
                }
            },
            None => false,
        }
    }

    pub fn stats(&self) -> &AlertStats {
        &self.stats
    }

    pub fn delivered(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Stop accepting alerts and wait until queued ones are delivered.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("alert thread panicked");
            }
        }
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

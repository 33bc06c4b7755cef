pub mod dispatcher;
pub mod sink;

pub use dispatcher::{AlertDispatcher, AlertStats};
pub use sink::{
    AlertSink, LogSink, TeamsSink, WebhookSink, adaptive_card, format_alert, format_summary, issue_card,
    summary_card,
};

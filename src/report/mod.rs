pub mod console;
pub mod report_model;

pub use console::{format_console_report, format_history, format_issue_list};
pub use report_model::{RunReport, SeverityCounts};

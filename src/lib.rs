//! Continuous exploration of a web application's interactive surface:
//! screen identity, site map construction, exploration scheduling with
//! recovery, outcome classification, and cross-cycle regression detection.
//!
//! The browser, the vision oracle and the alert channel are collaborators
//! behind the traits in [`collab`] and [`alert`].

pub mod alert;
pub mod cli;
pub mod collab;
pub mod coordinator;
pub mod error;
pub mod explorer;
pub mod identity;
pub mod logging;
pub mod outcome;
pub mod regression;
pub mod report;
pub mod sitemap;
pub mod store;

pub use error::{ExplorerError, Result};

pub mod classifier;

pub use classifier::{Outcome, VisitDecision, classify, visit_decision};

//! Contracts of the external collaborators the exploration core drives:
//! the browser session (capture + actuator), the vision oracle (element
//! discovery and failure diagnosis).

pub mod oracle;
pub mod session;

pub use oracle::{Diagnosis, DiagnosisContext, DiagnosisOracle, ElementCandidate, ElementDiscovery};
pub use session::{Action, BrowserSession, SessionFactory, SideSignals, View};

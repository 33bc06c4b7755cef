use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Failures surfaced by the exploration core and its collaborators.
///
/// Only a dead actuator session and persistence failures end a cycle early;
/// everything else degrades coverage for the current cycle.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Fingerprinting failed (blank or undecodable capture)
    #[error("screen identity unavailable: {0}")]
    Identity(String),

    /// Actuator rejected the action; `fatal` means the session is gone
    #[error("actuator failure: {message}")]
    Actuator { message: String, fatal: bool },

    /// Element discovery or diagnosis did not answer in time
    #[error("oracle timed out during {operation}")]
    OracleTimeout { operation: String },

    /// A recorded transition path no longer reaches its target
    #[error("recovery towards screen {target} failed: {reason}")]
    Recovery { target: usize, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Alert sink refused or could not take an alert; never fatal
    #[error("alert delivery failed: {0}")]
    Alert(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("exploration cancelled")]
    Cancelled,
}

impl ExplorerError {
    pub fn actuator(message: impl Into<String>) -> Self {
        ExplorerError::Actuator {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn session_dead(message: impl Into<String>) -> Self {
        ExplorerError::Actuator {
            message: message.into(),
            fatal: true,
        }
    }

    pub fn oracle_timeout(operation: impl Into<String>) -> Self {
        ExplorerError::OracleTimeout {
            operation: operation.into(),
        }
    }

    /// Whether this error must abort the running cycle.
    pub fn is_fatal_to_cycle(&self) -> bool {
        matches!(
            self,
            ExplorerError::Actuator { fatal: true, .. }
                | ExplorerError::Persistence(_)
                | ExplorerError::Io(_)
        )
    }
}

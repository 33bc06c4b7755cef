use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::{ExplorerError, Result};
use crate::explorer::InteractionRecord;

/// Append-only JSONL log of interaction records.
///
/// One line per record, written whole under a lock; records are appended
/// only after their outcome is classified.
pub struct InteractionLog {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl InteractionLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &InteractionRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|e| ExplorerError::Persistence(format!("interaction log lock poisoned: {}", e)))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Every well-formed record in the log at `path`, oldest first. Lines
    /// that do not parse are skipped; a missing file is an empty history.
    pub fn read_all(path: &Path) -> Result<Vec<InteractionRecord>> {
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InteractionRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), line = n + 1, error = %e, "skipping malformed record"),
            }
        }
        Ok(records)
    }
}

//! Append-only intervention log: a structured JSONL file for machine
//! consumption and a parallel human-readable markdown file, both grown
//! by appending one line per cycle-action and never rewritten in place.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::domain::models::InterventionLogEntry;

/// Writes each entry to both the JSONL and markdown logs under one lock,
/// so the two files never drift out of sync with each other.
#[derive(Clone)]
pub struct InterventionLog {
    jsonl_path: PathBuf,
    markdown_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl InterventionLog {
    /// Derives the JSONL sibling path from `markdown_path` by swapping its
    /// extension, so the two logs always live next to each other.
    #[must_use]
    pub fn new(markdown_path: impl Into<PathBuf>) -> Self {
        let markdown_path = markdown_path.into();
        let jsonl_path = markdown_path.with_extension("jsonl");
        Self { jsonl_path, markdown_path, write_lock: Arc::new(Mutex::new(())) }
    }

    /// Append one entry to both logs. Creates parent directories and the
    /// files themselves on first use; every subsequent call only appends.
    pub fn append(&self, entry: &InterventionLogEntry) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(parent) = self.markdown_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json_line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Self::append_line(&self.jsonl_path, &json_line)?;
        Self::append_line(&self.markdown_path, &entry.to_markdown_line())
    }

    fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }
}

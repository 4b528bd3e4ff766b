//! # History Archive
//!
//! Append-only JSONL ledger of completed days, one line per day written at
//! rollover. Reads never take the daily lock.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::durable;
use crate::models::HistoryEntry;

#[derive(Debug, Clone)]
pub struct HistoryArchive {
    path: PathBuf,
}

impl HistoryArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryArchive { path: path.into() }
    }

    pub fn append(&self, entry: &HistoryEntry) -> io::Result<()> {
        durable::append_json_line(&self.path, entry)
    }

    /// All archived days keyed by date.
    ///
    /// Unparseable lines are skipped. If a date appears twice the later line
    /// wins. A missing file is an empty archive.
    pub fn load(&self) -> BTreeMap<NaiveDate, HistoryEntry> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(path = %self.path.display(), error = %e, "history unreadable");
                }
                return BTreeMap::new();
            }
        };
        parse_lines(&text)
    }
}

fn parse_lines(text: &str) -> BTreeMap<NaiveDate, HistoryEntry> {
    let mut days = BTreeMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryEntry>(trimmed) {
            Ok(entry) => {
                days.insert(entry.date, entry);
            }
            Err(e) => tracing::debug!(error = %e, "skipping history line"),
        }
    }
    days
}

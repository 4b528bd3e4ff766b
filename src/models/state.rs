use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// The four token categories tracked per day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

impl Counters {
    pub fn total(&self) -> u64 {
        self.input
            .saturating_add(self.output)
            .saturating_add(self.cache_read)
            .saturating_add(self.cache_write)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Counters) {
        self.input = self.input.saturating_add(rhs.input);
        self.output = self.output.saturating_add(rhs.output);
        self.cache_read = self.cache_read.saturating_add(rhs.cache_read);
        self.cache_write = self.cache_write.saturating_add(rhs.cache_write);
    }
}

/// Per-session bookkeeping kept inside the daily file.
///
/// `c`/`cw` only move at a detected call boundary; the `l*` fields hold the
/// raw values seen on the previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    #[serde(rename = "i")]
    pub last_total_input: u64,
    #[serde(rename = "o")]
    pub last_total_output: u64,
    #[serde(rename = "c")]
    pub accumulated_cache_read: u64,
    #[serde(rename = "cw")]
    pub accumulated_cache_write: u64,
    /// Input counter the boundary detector compares against.
    #[serde(rename = "li")]
    pub last_boundary_input: u64,
    #[serde(rename = "lcr")]
    pub last_cache_read_snapshot: u64,
    #[serde(rename = "lcw")]
    pub last_cache_write_snapshot: u64,
}

/// Aggregate of every session's deltas for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyState {
    pub date: Option<NaiveDate>,
    pub sessions: BTreeMap<String, SessionRecord>,
    pub input: u64,
    pub output: u64,
    #[serde(rename = "cached")]
    pub cache_read: u64,
    pub cache_write: u64,
}

impl DailyState {
    pub fn empty_for(date: NaiveDate) -> Self {
        DailyState {
            date: Some(date),
            ..DailyState::default()
        }
    }

    pub fn counters(&self) -> Counters {
        Counters {
            input: self.input,
            output: self.output,
            cache_read: self.cache_read,
            cache_write: self.cache_write,
        }
    }

    pub fn add(&mut self, delta: Counters) {
        let mut c = self.counters();
        c += delta;
        self.input = c.input;
        self.output = c.output;
        self.cache_read = c.cache_read;
        self.cache_write = c.cache_write;
    }

    /// Baseline for `session_id`; a session not yet seen today starts at zero.
    pub fn baseline(&self, session_id: &str) -> SessionRecord {
        self.sessions.get(session_id).copied().unwrap_or_default()
    }

    /// Freeze into an archive line. `None` when the state carries no date.
    pub fn to_history_entry(&self) -> Option<HistoryEntry> {
        Some(HistoryEntry {
            date: self.date?,
            input: self.input,
            output: self.output,
            cache_read: self.cache_read,
            cache_write: self.cache_write,
            sessions: self.sessions.len(),
        })
    }
}

/// One completed day in the history archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub cache_read: u64,
    #[serde(default)]
    pub cache_write: u64,
    #[serde(default)]
    pub sessions: usize,
}

impl HistoryEntry {
    pub fn counters(&self) -> Counters {
        Counters {
            input: self.input,
            output: self.output,
            cache_read: self.cache_read,
            cache_write: self.cache_write,
        }
    }
}

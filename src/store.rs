//! # Daily State Store
//!
//! Owns the per-day aggregate shared by every statusline process on the
//! machine. `apply` is the only mutating entry point; it holds an exclusive
//! advisory lock on a sidecar `.lock` file across load, rollover, update and
//! persist, and releases it on every path out (the guard is dropped).
//!
//! Failures that must not cost the user their status line are surfaced as
//! values on [`ApplyOutcome`] instead of errors:
//! - a state file that is missing, empty or corrupt loads as empty state
//! - an archive append failure is reported via [`Rollover::ArchiveFailed`]
//! - a persist failure is reported via [`Persistence::NotSaved`], with the
//!   freshly computed totals still returned
//!
//! Only failing to take the lock is an error.

use chrono::{Local, NaiveDate};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::boundary::{BoundaryDetector, CallBoundary, CounterHeuristic};
use crate::durable;
use crate::history::HistoryArchive;
use crate::models::{CallObservation, Counters, DailyState, HistoryEntry, UsageSnapshot};
use crate::session;
use crate::utils::StatePaths;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open lock file {}: {source}", path.display())]
    LockOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot acquire lock on {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether the updated state reached disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Saved,
    NotSaved(String),
}

/// What happened to the previous day's state during this update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollover {
    /// Stored state was already for today, or had no date at all.
    None,
    /// Previous day had no activity; discarded without archiving.
    SkippedEmpty(NaiveDate),
    Archived(HistoryEntry),
    ArchiveFailed { entry: HistoryEntry, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub date: NaiveDate,
    /// Running totals for the day after this update.
    pub today: Counters,
    pub session_cache_read: u64,
    pub session_cache_write: u64,
    pub boundary: CallBoundary,
    pub persistence: Persistence,
    pub rollover: Rollover,
}

impl ApplyOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self.persistence, Persistence::Saved)
    }
}

/// Exclusive flock on the day file's sidecar. Released on drop.
struct DayLock {
    file: File,
}

impl DayLock {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        let open_err = |source| StoreError::LockOpen {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(open_err)?;
        }
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let file = opts.open(path).map_err(open_err)?;
        // Blocks until the previous holder releases; no timeout.
        FileExt::lock_exclusive(&file).map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(DayLock { file })
    }
}

impl Drop for DayLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub struct DailyStore<D: BoundaryDetector = CounterHeuristic> {
    daily_path: PathBuf,
    lock_path: PathBuf,
    archive: HistoryArchive,
    detector: D,
}

impl DailyStore<CounterHeuristic> {
    pub fn new(paths: &StatePaths) -> Self {
        DailyStore::with_detector(paths, CounterHeuristic)
    }
}

impl<D: BoundaryDetector> DailyStore<D> {
    pub fn with_detector(paths: &StatePaths, detector: D) -> Self {
        DailyStore {
            daily_path: paths.daily.clone(),
            lock_path: paths.lock.clone(),
            archive: HistoryArchive::new(paths.history.clone()),
            detector,
        }
    }

    pub fn archive(&self) -> &HistoryArchive {
        &self.archive
    }

    /// Fold one snapshot into today's state.
    pub fn apply(&self, snapshot: &UsageSnapshot) -> Result<ApplyOutcome, StoreError> {
        self.apply_on(
            Local::now().date_naive(),
            &snapshot.session_id,
            snapshot.total_input_tokens,
            snapshot.total_output_tokens,
            snapshot.current_call,
        )
    }

    /// As [`DailyStore::apply`], but never fails: when the day file cannot be
    /// locked the snapshot is dropped and zero totals are shown for today.
    pub fn apply_or_zero(&self, snapshot: &UsageSnapshot) -> (NaiveDate, Counters) {
        match self.apply(snapshot) {
            Ok(outcome) => {
                tracing::debug!(
                    boundary = ?outcome.boundary,
                    rollover = ?outcome.rollover,
                    persisted = outcome.is_persisted(),
                    "snapshot applied"
                );
                (outcome.date, outcome.today)
            }
            Err(e) => {
                tracing::warn!(error = %e, "daily state unavailable, showing zero totals");
                (Local::now().date_naive(), Counters::default())
            }
        }
    }

    /// As [`DailyStore::apply`], with the calendar date supplied by the caller.
    pub fn apply_on(
        &self,
        today: NaiveDate,
        session_id: &str,
        total_input: u64,
        total_output: u64,
        call: CallObservation,
    ) -> Result<ApplyOutcome, StoreError> {
        let _lock = DayLock::acquire(&self.lock_path)?;

        let mut state = self.read_unlocked();
        let rollover = self.roll_over(&mut state, today);

        let previous = state.baseline(session_id);
        let update =
            session::accumulate(&self.detector, &previous, total_input, total_output, call);
        state.add(update.delta);
        state.sessions.insert(session_id.to_string(), update.record);

        let persistence = match durable::write_json_atomic(&self.daily_path, &state) {
            Ok(()) => Persistence::Saved,
            Err(e) => {
                tracing::warn!(path = %self.daily_path.display(), error = %e, "daily state not saved");
                Persistence::NotSaved(e.to_string())
            }
        };

        Ok(ApplyOutcome {
            date: today,
            today: state.counters(),
            session_cache_read: update.record.accumulated_cache_read,
            session_cache_write: update.record.accumulated_cache_write,
            boundary: update.boundary,
            persistence,
            rollover,
        })
    }

    /// Current persisted state without taking the lock.
    ///
    /// The file is only ever replaced by rename, so this sees a complete old
    /// or new version. Missing, empty or corrupt files read as empty state.
    pub fn read_unlocked(&self) -> DailyState {
        let bytes = match fs::read(&self.daily_path) {
            Ok(b) => b,
            Err(_) => return DailyState::default(),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return DailyState::default();
        }
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::debug!(path = %self.daily_path.display(), error = %e, "daily state corrupt, starting empty");
            DailyState::default()
        })
    }

    /// Replace a stale day with an empty one for `today`, archiving the old
    /// day when it saw any activity. Archive failures are reported, not raised.
    ///
    /// Session records do not survive the rollover: a session live across
    /// midnight is counted again from a zero baseline.
    fn roll_over(&self, state: &mut DailyState, today: NaiveDate) -> Rollover {
        if state.date == Some(today) {
            return Rollover::None;
        }
        let stale = std::mem::replace(state, DailyState::empty_for(today));
        let entry = stale.to_history_entry();

        let Some(entry) = entry else {
            return Rollover::None;
        };
        if entry.counters().is_empty() {
            return Rollover::SkippedEmpty(entry.date);
        }
        match self.archive.append(&entry) {
            Ok(()) => {
                tracing::debug!(date = %entry.date, "archived previous day");
                Rollover::Archived(entry)
            }
            Err(e) => {
                tracing::warn!(date = %entry.date, error = %e, "failed to archive previous day");
                Rollover::ArchiveFailed {
                    entry,
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DailyStore {
        DailyStore::new(&StatePaths::in_dir(dir.path()))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn call(read: u64, write: u64) -> CallObservation {
        CallObservation {
            cache_read_tokens: read,
            cache_write_tokens: write,
        }
    }

    #[test]
    fn first_apply_creates_state() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let out = s.apply_on(date(18), "a", 100, 20, call(500, 50)).unwrap();
        assert!(out.is_persisted());
        assert_eq!(out.rollover, Rollover::None);
        assert_eq!(
            out.today,
            Counters {
                input: 100,
                output: 20,
                cache_read: 500,
                cache_write: 50
            }
        );
        assert_eq!(out.session_cache_read, 500);

        let state = s.read_unlocked();
        assert_eq!(state.date, Some(date(18)));
        assert_eq!(state.sessions.len(), 1);
    }

    #[test]
    fn repeated_snapshot_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.apply_on(date(18), "a", 100, 20, call(500, 50)).unwrap();
        let out = s.apply_on(date(18), "a", 100, 20, call(500, 50)).unwrap();
        assert_eq!(out.boundary, CallBoundary::ContinuingCall);
        assert_eq!(out.today.cache_read, 500);
        assert_eq!(out.today.input, 100);
    }

    #[test]
    fn sessions_sum_into_day() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.apply_on(date(18), "a", 100, 10, call(0, 0)).unwrap();
        let out = s.apply_on(date(18), "b", 40, 4, call(1000, 0)).unwrap();
        assert_eq!(out.today.input, 140);
        assert_eq!(out.today.output, 14);
        assert_eq!(out.today.cache_read, 1000);
        assert_eq!(out.session_cache_read, 1000);
    }

    #[test]
    fn session_spanning_midnight_restarts_from_zero_baseline() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.apply_on(date(17), "a", 100, 50, call(400, 0)).unwrap();

        let out = s.apply_on(date(18), "a", 130, 60, call(400, 0)).unwrap();
        assert!(matches!(out.rollover, Rollover::Archived(_)));
        assert_eq!(out.today.input, 130);
        assert_eq!(out.today.output, 60);
        assert_eq!(out.today.cache_read, 400);
        assert_eq!(out.session_cache_read, 400);

        let state = s.read_unlocked();
        assert_eq!(state.date, Some(date(18)));
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions["a"].last_total_input, 130);
    }

    #[test]
    fn new_session_after_midnight_starts_from_zero() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.apply_on(date(17), "a", 100, 50, call(0, 0)).unwrap();
        let out = s.apply_on(date(18), "b", 10, 2, call(0, 0)).unwrap();
        assert_eq!(out.today.input, 10);
        assert_eq!(out.today.output, 2);

        let state = s.read_unlocked();
        assert_eq!(state.sessions.len(), 1);
        assert!(!state.sessions.contains_key("a"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let paths = StatePaths::in_dir(dir.path());
        fs::write(&paths.daily, b"{ not json").unwrap();
        let s = DailyStore::new(&paths);
        assert_eq!(s.read_unlocked(), DailyState::default());

        let out = s.apply_on(date(18), "a", 5, 1, call(0, 0)).unwrap();
        assert_eq!(out.rollover, Rollover::None);
        assert_eq!(out.today.input, 5);
    }

    #[test]
    fn empty_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let paths = StatePaths::in_dir(dir.path());
        fs::write(&paths.daily, b"").unwrap();
        assert_eq!(DailyStore::new(&paths).read_unlocked(), DailyState::default());
    }

    #[test]
    fn idle_previous_day_is_not_archived() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.apply_on(date(17), "a", 0, 0, call(0, 0)).unwrap();
        let out = s.apply_on(date(18), "a", 10, 1, call(0, 0)).unwrap();
        assert_eq!(out.rollover, Rollover::SkippedEmpty(date(17)));
        assert!(s.archive().load().is_empty());
    }

    #[test]
    fn archive_failure_does_not_block_update() {
        let dir = TempDir::new().unwrap();
        let paths = StatePaths::in_dir(dir.path());
        // A directory where the archive file should be makes appends fail.
        fs::create_dir_all(&paths.history).unwrap();
        let s = DailyStore::new(&paths);
        s.apply_on(date(17), "a", 100, 50, call(0, 0)).unwrap();

        let out = s.apply_on(date(18), "a", 130, 60, call(0, 0)).unwrap();
        assert!(matches!(out.rollover, Rollover::ArchiveFailed { .. }));
        assert!(out.is_persisted());
        assert_eq!(out.today.input, 130);
        assert_eq!(out.today.output, 60);
    }

    #[test]
    fn persist_failure_still_returns_totals() {
        let dir = TempDir::new().unwrap();
        let paths = StatePaths::in_dir(dir.path());
        fs::create_dir_all(&paths.daily).unwrap();
        fs::write(paths.daily.join("blocker"), b"x").unwrap();
        let s = DailyStore::new(&paths);

        let out = s.apply_on(date(18), "a", 70, 7, call(300, 0)).unwrap();
        assert!(!out.is_persisted());
        assert!(matches!(out.persistence, Persistence::NotSaved(_)));
        assert_eq!(out.today.input, 70);
        assert_eq!(out.today.cache_read, 300);
    }

    #[test]
    fn unopenable_lock_is_an_error() {
        let dir = TempDir::new().unwrap();
        let paths = StatePaths::in_dir(dir.path());
        // A directory where the lock file should be cannot be opened for writing.
        fs::create_dir_all(&paths.lock).unwrap();
        let s = DailyStore::new(&paths);

        let err = s.apply_on(date(18), "a", 10, 1, call(0, 0)).unwrap_err();
        assert!(matches!(err, StoreError::LockOpen { .. }));
        assert!(!paths.daily.exists());
    }

    #[test]
    fn lock_failure_degrades_to_zero_totals() {
        let dir = TempDir::new().unwrap();
        let paths = StatePaths::in_dir(dir.path());
        fs::create_dir_all(&paths.lock).unwrap();
        let snapshot = UsageSnapshot {
            session_id: "a".to_string(),
            total_input_tokens: 500,
            total_output_tokens: 20,
            ..UsageSnapshot::default()
        };

        let (_, today) = DailyStore::new(&paths).apply_or_zero(&snapshot);
        assert_eq!(today, Counters::default());
    }

    #[test]
    fn apply_or_zero_returns_live_totals() {
        let dir = TempDir::new().unwrap();
        let snapshot = UsageSnapshot {
            session_id: "a".to_string(),
            total_input_tokens: 500,
            total_output_tokens: 20,
            ..UsageSnapshot::default()
        };
        let (_, today) = store(&dir).apply_or_zero(&snapshot);
        assert_eq!(today.input, 500);
        assert_eq!(today.output, 20);
    }
}

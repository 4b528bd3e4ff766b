//! # Range Aggregation
//!
//! Week and month totals built from the history archive (completed days) plus
//! the live daily counters (today). Today is never read from the archive.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::models::{Counters, DailyState, HistoryEntry};

/// Totals for the status line's D/W/M segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeTotals {
    pub today: Counters,
    pub week: Counters,
    pub month: Counters,
}

/// Monday of the week containing `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// First day of an `n`-day window ending on `today` (inclusive).
pub fn trailing_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days.max(1) - 1))
}

/// Sum archive days in `[start, today)` and add the live counters for today.
///
/// Days with no archive line contribute nothing.
pub fn sum_window(
    archive: &BTreeMap<NaiveDate, HistoryEntry>,
    start: NaiveDate,
    today: NaiveDate,
    live_today: Counters,
) -> Counters {
    let mut total = live_today;
    if start < today {
        for entry in archive.range(start..today).map(|(_, e)| e) {
            total += entry.counters();
        }
    }
    total
}

pub fn range_totals(
    archive: &BTreeMap<NaiveDate, HistoryEntry>,
    today: NaiveDate,
    live_today: Counters,
) -> RangeTotals {
    RangeTotals {
        today: live_today,
        week: sum_window(archive, week_start(today), today, live_today),
        month: sum_window(archive, month_start(today), today, live_today),
    }
}

/// Every known day: the archive with the live day laid over it.
///
/// The live record replaces an archive line carrying the same date.
pub fn all_days(
    mut archive: BTreeMap<NaiveDate, HistoryEntry>,
    live: &DailyState,
) -> BTreeMap<NaiveDate, HistoryEntry> {
    if let Some(entry) = live.to_history_entry() {
        archive.insert(entry.date, entry);
    }
    archive
}

/// Token counters and session count for the `days`-long window ending on
/// `today`, read from a merged day map.
pub fn trailing_totals(
    days: &BTreeMap<NaiveDate, HistoryEntry>,
    today: NaiveDate,
    window: u32,
) -> (Counters, usize) {
    let start = trailing_start(today, window);
    days.range(start..=today)
        .fold((Counters::default(), 0), |(mut c, n), (_, e)| {
            c += e.counters();
            (c, n + e.sessions)
        })
}

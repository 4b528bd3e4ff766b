use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

use crate::aggregate::{RangeTotals, trailing_start, trailing_totals};
use crate::cli::ReportArg;
use crate::energy::{self, EnergyMode, MID_RATES};
use crate::models::{Counters, HistoryEntry, UsageSnapshot};
use crate::usage_api::Quota;
use crate::utils::{format_percent, format_tokens};

const SEPARATOR: &str = " | ";

#[cfg(feature = "colors")]
fn colorize_percent(text: String, pct: f64) -> String {
    if pct >= 95.0 {
        text.red().bold().to_string()
    } else if pct >= 80.0 {
        text.yellow().bold().to_string()
    } else {
        text.green().to_string()
    }
}

#[cfg(not(feature = "colors"))]
fn colorize_percent(text: String, _pct: f64) -> String {
    text
}

fn percent(text: String, pct: f64, colored: bool) -> String {
    if colored {
        colorize_percent(text, pct)
    } else {
        text
    }
}

fn tokens_and_energy(label: &str, counters: &Counters, mode: EnergyMode) -> String {
    format!(
        "{label}:{} {}",
        format_tokens(counters.total()),
        energy::display(counters, mode)
    )
}

fn quota_segment(quota: &Quota, colored: bool) -> Option<String> {
    let q5 = quota.five_hour?;
    let mut seg = format!("5h:{}", percent(format!("{q5:.0}%"), q5, colored));
    if let Some(q7) = quota.seven_day {
        seg.push_str(&format!(" 7d:{}", percent(format!("{q7:.0}%"), q7, colored)));
    }
    Some(seg)
}

/// The single status line: model, context, quota, then day/week/month
/// tokens with energy. Segments without data are left out.
pub fn build_status_line(
    snapshot: &UsageSnapshot,
    totals: &RangeTotals,
    quota: Option<&Quota>,
    mode: EnergyMode,
    colored: bool,
) -> String {
    let mut parts = vec![snapshot.model_name.clone()];
    if let Some(pct) = snapshot.context_used_percent {
        parts.push(format!(
            "Ctx:{}",
            percent(format!("{}%", format_percent(pct)), pct, colored)
        ));
    }
    if let Some(seg) = quota.and_then(|q| quota_segment(q, colored)) {
        parts.push(seg);
    }
    parts.push(tokens_and_energy("D", &totals.today, mode));
    parts.push(tokens_and_energy("W", &totals.week, mode));
    parts.push(tokens_and_energy("M", &totals.month, mode));
    parts.join(SEPARATOR)
}

/// `Oct 18`, `Oct 12–18`, or `Sep 19 – Oct 18` across months.
pub fn range_label(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        return end.format("%b %-d").to_string();
    }
    if start.month() == end.month() && start.year() == end.year() {
        format!("{}–{}", start.format("%b %-d"), end.day())
    } else {
        format!("{} – {}", start.format("%b %-d"), end.format("%b %-d"))
    }
}

/// Three-line shareable summary for a trailing window ending on `today`.
pub fn render_report(
    days: &BTreeMap<NaiveDate, HistoryEntry>,
    today: NaiveDate,
    view: ReportArg,
) -> String {
    let (counters, sessions) = trailing_totals(days, today, view.days());
    let wh = MID_RATES.estimate_counters(&counters) / 1000.0;
    format!(
        "⚡ Claude Code · {}\n{} tokens · {} sessions\n{}",
        range_label(trailing_start(today, view.days()), today),
        format_tokens(counters.total()),
        sessions,
        energy::comparison(wh)
    )
}

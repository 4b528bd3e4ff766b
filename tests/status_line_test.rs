use chrono::NaiveDate;
use std::collections::BTreeMap;

use energy_statusline::aggregate::{all_days, range_totals};
use energy_statusline::cli::ReportArg;
use energy_statusline::display::{build_status_line, render_report};
use energy_statusline::energy::EnergyMode;
use energy_statusline::models::UsageSnapshot;
use energy_statusline::store::DailyStore;
use energy_statusline::usage_api::Quota;
use energy_statusline::utils::StatePaths;
use tempfile::TempDir;

const PAYLOAD: &str = r#"{
    "session_id": "abc",
    "model": {"id": "claude-opus-4", "display_name": "Opus"},
    "context_window": {
        "total_input_tokens": 2000,
        "total_output_tokens": 1000,
        "used_percentage": 37,
        "current_usage": {
            "cache_read_input_tokens": 40000,
            "cache_creation_input_tokens": 0
        }
    }
}"#;

#[test]
fn test_snapshot_to_line() {
    let temp_dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(temp_dir.path());
    let today = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
    let snapshot = UsageSnapshot::from_slice(PAYLOAD.as_bytes());

    let store = DailyStore::new(&paths);
    let out = store
        .apply_on(
            today,
            &snapshot.session_id,
            snapshot.total_input_tokens,
            snapshot.total_output_tokens,
            snapshot.current_call,
        )
        .unwrap();
    let totals = range_totals(&BTreeMap::new(), today, out.today);
    let quota = Quota {
        five_hour: Some(8.0),
        seven_day: Some(61.0),
    };

    let line = build_status_line(&snapshot, &totals, Some(&quota), EnergyMode::Mid, false);
    // 2000*0.39 + 1000*1.4 + 40000*0.015 = 2780 mWh, snapped to 2 Wh
    assert_eq!(
        line,
        "Opus | Ctx:37% | 5h:8% 7d:61% | D:43k ~2Wh | W:43k ~2Wh | M:43k ~2Wh"
    );
}

#[test]
fn test_malformed_input_still_yields_a_line() {
    let temp_dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(temp_dir.path());
    let today = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
    let snapshot = UsageSnapshot::from_slice(b"not json at all");

    let out = DailyStore::new(&paths)
        .apply_on(
            today,
            &snapshot.session_id,
            snapshot.total_input_tokens,
            snapshot.total_output_tokens,
            snapshot.current_call,
        )
        .unwrap();
    let totals = range_totals(&BTreeMap::new(), today, out.today);
    let line = build_status_line(&snapshot, &totals, None, EnergyMode::Mid, false);
    assert_eq!(line, "? | D:0 ~0 | W:0 ~0 | M:0 ~0");
}

#[test]
fn test_wrongly_typed_extras_keep_session_counters() {
    let temp_dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(temp_dir.path());
    let today = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
    let payload = r#"{
        "session_id": "abc",
        "model": {"id": 7, "display_name": "Opus"},
        "context_window": {"total_input_tokens": 1200, "used_percentage": "42"}
    }"#;
    let snapshot = UsageSnapshot::from_slice(payload.as_bytes());

    let out = DailyStore::new(&paths)
        .apply_on(
            today,
            &snapshot.session_id,
            snapshot.total_input_tokens,
            snapshot.total_output_tokens,
            snapshot.current_call,
        )
        .unwrap();
    assert_eq!(out.today.input, 1200);

    let totals = range_totals(&BTreeMap::new(), today, out.today);
    let line = build_status_line(&snapshot, &totals, None, EnergyMode::Mid, false);
    // 1200 * 0.39 = 468 mWh, snapped to 500 mWh
    assert_eq!(line, "Opus | D:1k ~500mWh | W:1k ~500mWh | M:1k ~500mWh");

    let state = DailyStore::new(&paths).read_unlocked();
    assert!(state.sessions.contains_key("abc"));
}

#[test]
fn test_report_reads_live_day_and_archive() {
    let temp_dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(temp_dir.path());
    let store = DailyStore::new(&paths);
    let call = Default::default();

    let yesterday = NaiveDate::from_ymd_opt(2025, 10, 17).unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
    store.apply_on(yesterday, "a", 500_000, 0, call).unwrap();
    store.apply_on(today, "b", 2_000_000, 0, call).unwrap();

    let days = all_days(store.archive().load(), &store.read_unlocked());
    assert_eq!(days.len(), 2);

    let week = render_report(&days, today, ReportArg::Week);
    let mut lines = week.lines();
    assert_eq!(lines.next(), Some("⚡ Claude Code · Oct 12–18"));
    assert_eq!(lines.next(), Some("2.5M tokens · 2 sessions"));
    // 2.5M fresh input * 0.39 = 975 Wh, snapped to 1 kWh
    assert_eq!(lines.next(), Some("~1kWh ≈ an hour of AC (±3×)"));

    let today_only = render_report(&days, today, ReportArg::Today);
    assert!(today_only.contains("2.0M tokens · 1 sessions"));
}

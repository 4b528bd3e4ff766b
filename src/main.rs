use anyhow::{Result, bail};
use chrono::{Local, Utc};

use energy_statusline::aggregate::{RangeTotals, all_days, range_totals};
use energy_statusline::cli::Args;
use energy_statusline::display::{build_status_line, render_report};
use energy_statusline::durable;
use energy_statusline::logging::init_logging;
use energy_statusline::models::UsageSnapshot;
use energy_statusline::store::DailyStore;
use energy_statusline::usage_api::get_quota;
use energy_statusline::utils::{StatePaths, read_stdin};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let paths = StatePaths::resolve(args.state_dir.as_deref());
    if let Some(view) = args.report {
        let today = Local::now().date_naive();
        let store = DailyStore::new(&paths);
        let days = all_days(store.archive().load(), &store.read_unlocked());
        if days.is_empty() {
            bail!("No data found. Run the statusline with Claude Code first.");
        }
        println!("{}", render_report(&days, today, view));
        return Ok(());
    }

    let stdin = read_stdin().unwrap_or_default();
    if args.debug_capture {
        capture_raw(&paths, &stdin);
    }
    let snapshot = UsageSnapshot::from_slice(&stdin);

    let store = DailyStore::new(&paths);
    let (today, live_today) = store.apply_or_zero(&snapshot);

    let totals: RangeTotals = range_totals(&store.archive().load(), today, live_today);
    let quota = if args.no_quota {
        None
    } else {
        get_quota(&paths.quota_cache)
    };

    print!(
        "{}",
        build_status_line(
            &snapshot,
            &totals,
            quota.as_ref(),
            args.energy_mode(),
            args.use_color()
        )
    );
    Ok(())
}

/// Record the raw payload for offline analysis. Failures are ignored.
fn capture_raw(paths: &StatePaths, stdin: &[u8]) {
    let raw: serde_json::Value =
        serde_json::from_slice(stdin).unwrap_or_else(|_| serde_json::json!({}));
    let ts = Utc::now().timestamp_millis() as f64 / 1000.0;
    let entry = serde_json::json!({ "ts": ts, "raw": raw });
    if let Err(e) = durable::append_json_line(&paths.debug_log, &entry) {
        tracing::debug!(error = %e, "debug capture skipped");
    }
}

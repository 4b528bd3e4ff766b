use std::io::Read;
use std::path::{Path, PathBuf};

pub const DAILY_FILE: &str = "statusline_daily.json";
pub const LOCK_FILE: &str = "statusline_daily.lock";
pub const HISTORY_FILE: &str = "statusline_history.jsonl";
pub const QUOTA_CACHE_FILE: &str = "statusline_quota_cache.json";
pub const DEBUG_FILE: &str = "statusline_debug.jsonl";

/// Locations of every file the statusline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub daily: PathBuf,
    pub lock: PathBuf,
    pub history: PathBuf,
    pub quota_cache: PathBuf,
    pub debug_log: PathBuf,
}

impl StatePaths {
    pub fn in_dir(dir: &Path) -> Self {
        StatePaths {
            daily: dir.join(DAILY_FILE),
            lock: dir.join(LOCK_FILE),
            history: dir.join(HISTORY_FILE),
            quota_cache: dir.join(QUOTA_CACHE_FILE),
            debug_log: dir.join(DEBUG_FILE),
        }
    }

    /// Explicit directory if given, else `~/.claude`.
    pub fn resolve(override_dir: Option<&Path>) -> Self {
        if let Some(dir) = override_dir {
            return StatePaths::in_dir(dir);
        }
        StatePaths::in_dir(&claude_home())
    }
}

pub fn claude_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".claude"))
        .unwrap_or_else(|| PathBuf::from(".claude"))
}

pub fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

/// Compact token count: `1.2M`, `35k`, `812`.
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.0}k", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}

/// Render a percentage without a trailing `.0`: `42`, `42.5`.
pub fn format_percent(p: f64) -> String {
    format!("{p}")
}

//! Quota percentages for the rolling 5-hour and 7-day windows, read from the
//! Claude OAuth usage endpoint. This endpoint is an undocumented beta and may
//! change without notice, so every failure here degrades to "no quota shown".

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::durable;
use crate::utils::claude_home;

const USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";
const ANTHROPIC_BETA: &str = "oauth-2025-04-20";
const USER_AGENT: &str = "claude-code";
pub const CACHE_TTL_SECONDS: i64 = 300;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Utilization percentages; either may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quota {
    pub five_hour: Option<f64>,
    pub seven_day: Option<f64>,
}

/// On-disk cache layout: `{q5, q7, ts}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct QuotaCache {
    #[serde(default)]
    q5: Option<f64>,
    #[serde(default)]
    q7: Option<f64>,
    #[serde(default)]
    ts: i64,
}

impl From<QuotaCache> for Quota {
    fn from(c: QuotaCache) -> Self {
        Quota {
            five_hour: c.q5,
            seven_day: c.q7,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsageLimitDto {
    utilization: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UsageResponseDto {
    #[serde(default)]
    five_hour: Option<UsageLimitDto>,
    #[serde(default)]
    seven_day: Option<UsageLimitDto>,
}

fn read_cache(path: &Path) -> Option<QuotaCache> {
    let raw = fs::read(path).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// Cached quota when younger than the TTL, otherwise `fetch`, otherwise the
/// stale cache. A successful fetch is written back to `cache_path`.
pub fn resolve_quota<F>(cache_path: &Path, now: i64, fetch: F) -> Option<Quota>
where
    F: FnOnce() -> Option<Quota>,
{
    let cached = read_cache(cache_path);
    if let Some(c) = cached {
        if now - c.ts < CACHE_TTL_SECONDS {
            return Some(c.into());
        }
    }

    match fetch() {
        Some(q) => {
            let entry = QuotaCache {
                q5: q.five_hour,
                q7: q.seven_day,
                ts: now,
            };
            if let Err(e) = durable::write_json_atomic(cache_path, &entry) {
                tracing::debug!(error = %e, "quota cache not written");
            }
            Some(q)
        }
        None => cached.map(Quota::from),
    }
}

/// Quota for display: cached, fetched, or stale, in that order.
pub fn get_quota(cache_path: &Path) -> Option<Quota> {
    resolve_quota(cache_path, Utc::now().timestamp(), fetch_quota)
}

fn fetch_quota() -> Option<Quota> {
    let token = find_oauth_token()?;
    match request_usage(&token) {
        Ok(q) => Some(q),
        Err(e) => {
            tracing::debug!(error = %e, "quota fetch failed");
            None
        }
    }
}

fn request_usage(token: &str) -> anyhow::Result<Quota> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build();
    let agent: ureq::Agent = config.into();

    let mut response = agent
        .get(USAGE_ENDPOINT)
        .header("Authorization", &format!("Bearer {token}"))
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .header("anthropic-beta", ANTHROPIC_BETA)
        .call()
        .context("usage request")?;

    let dto: UsageResponseDto = response
        .body_mut()
        .read_json()
        .context("decode usage response")?;
    Ok(Quota {
        five_hour: dto.five_hour.and_then(|l| l.utilization),
        seven_day: dto.seven_day.and_then(|l| l.utilization),
    })
}

fn find_oauth_token() -> Option<String> {
    for var in ["CLAUDE_CODE_OAUTH_TOKEN", "ANTHROPIC_AUTH_TOKEN"] {
        if let Ok(val) = env::var(var) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(token) = read_from_macos_keychain() {
            return Some(token);
        }
    }

    credential_files()
        .iter()
        .filter_map(|p| fs::read_to_string(p).ok())
        .find_map(|raw| token_from_credentials(&raw, Utc::now().timestamp_millis()))
}

fn credential_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(dir) = env::var("CLAUDE_CONFIG_DIR") {
        let dir = dir.trim();
        if !dir.is_empty() {
            files.push(Path::new(dir).join(".credentials.json"));
        }
    }
    files.push(claude_home().join(".credentials.json"));
    files
}

/// Pull an access token out of a stored credentials blob.
///
/// Accepts the `claudeAiOauth` wrapper (skipped when `expiresAt`, in epoch
/// millis, has passed), a bare `accessToken`/`access_token` object, or a raw
/// non-JSON token string.
fn token_from_credentials(raw: &str, now_ms: i64) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let json: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return Some(raw.to_string()),
    };

    if let Some(oauth) = json.get("claudeAiOauth").filter(|v| v.is_object()) {
        if let Some(token) = oauth.get("accessToken").and_then(|v| v.as_str()) {
            let expires = oauth.get("expiresAt").and_then(|v| v.as_f64()).unwrap_or(0.0);
            if expires > 0.0 && expires < now_ms as f64 {
                return None;
            }
            return non_empty(token);
        }
    }
    ["accessToken", "access_token"]
        .iter()
        .find_map(|k| json.get(*k).and_then(|v| v.as_str()))
        .and_then(non_empty)
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

#[cfg(target_os = "macos")]
fn read_from_macos_keychain() -> Option<String> {
    use sha2::{Digest, Sha256};
    use std::process::Command;

    const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

    // If CLAUDE_CONFIG_DIR is set, the service name carries an 8-char SHA256 suffix
    let mut service_name = KEYCHAIN_SERVICE.to_string();
    if let Ok(config_dir) = env::var("CLAUDE_CONFIG_DIR") {
        let hash = Sha256::digest(config_dir.as_bytes());
        let suffix = format!("{:x}", hash).chars().take(8).collect::<String>();
        service_name.push('-');
        service_name.push_str(&suffix);
    }

    // Current user's entry first, then any account
    let mut attempts: Vec<Vec<String>> = Vec::new();
    if let Ok(user) = env::var("USER") {
        if !user.is_empty() {
            attempts.push(vec!["-s".into(), service_name.clone(), "-a".into(), user]);
        }
    }
    attempts.push(vec!["-s".into(), service_name]);

    let now_ms = Utc::now().timestamp_millis();
    for extra in attempts {
        let output = Command::new("security")
            .arg("find-generic-password")
            .args(&extra)
            .arg("-w")
            .output()
            .ok()?;
        if !output.status.success() {
            continue;
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        if let Some(token) = token_from_credentials(&raw, now_ms) {
            return Some(token);
        }
    }
    None
}

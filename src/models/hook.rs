use serde::{Deserialize, Deserializer};

/// Accept any JSON for a field and keep it only if it has the expected type.
/// A wrongly typed field becomes `None` instead of failing the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct HookModel {
    #[serde(deserialize_with = "lenient")]
    pub display_name: Option<String>,
}

/// Usage of the most recent API call only; not cumulative.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct HookCurrentUsage {
    #[serde(deserialize_with = "lenient")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub cache_creation_input_tokens: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct HookContextWindow {
    #[serde(deserialize_with = "lenient")]
    pub total_input_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub total_output_tokens: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub used_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub current_usage: Option<HookCurrentUsage>,
}

/// Raw statusLine payload as delivered on stdin. Only the consumed fields are
/// modelled, and each one falls back to `None` on its own when it is missing
/// or has the wrong type.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct HookJson {
    #[serde(deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub model: Option<HookModel>,
    #[serde(deserialize_with = "lenient")]
    pub context_window: Option<HookContextWindow>,
}

/// Cache counters reported for the call currently in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallObservation {
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

/// Normalized view of one invocation's input with zero defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub session_id: String,
    pub model_name: String,
    pub context_used_percent: Option<f64>,
    /// Session-cumulative fresh input tokens.
    pub total_input_tokens: u64,
    /// Session-cumulative output tokens.
    pub total_output_tokens: u64,
    pub current_call: CallObservation,
}

impl Default for UsageSnapshot {
    fn default() -> Self {
        UsageSnapshot::from(HookJson::default())
    }
}

impl UsageSnapshot {
    /// Parse stdin bytes. Malformed or non-JSON input yields the empty snapshot.
    pub fn from_slice(raw: &[u8]) -> Self {
        match serde_json::from_slice::<HookJson>(raw) {
            Ok(hook) => hook.into(),
            Err(e) => {
                tracing::debug!(error = %e, "snapshot did not parse, using empty snapshot");
                UsageSnapshot::default()
            }
        }
    }
}

impl From<HookJson> for UsageSnapshot {
    fn from(hook: HookJson) -> Self {
        let ctx = hook.context_window.unwrap_or_default();
        let current = ctx.current_usage.unwrap_or_default();
        UsageSnapshot {
            session_id: hook.session_id.unwrap_or_else(|| "unknown".to_string()),
            model_name: hook
                .model
                .and_then(|m| m.display_name)
                .unwrap_or_else(|| "?".to_string()),
            context_used_percent: ctx.used_percentage,
            total_input_tokens: ctx.total_input_tokens.unwrap_or(0),
            total_output_tokens: ctx.total_output_tokens.unwrap_or(0),
            current_call: CallObservation {
                cache_read_tokens: current.cache_read_input_tokens.unwrap_or(0),
                cache_write_tokens: current.cache_creation_input_tokens.unwrap_or(0),
            },
        }
    }
}

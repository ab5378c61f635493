//! JSON file overlay applied on top of CLI/environment settings.
//!
//! The file is a flat object keyed by the same names as the environment
//! variables (`PORT`, `UPSTREAM_API_BASE`, ...). Values are coerced loosely:
//! numbers may be given as strings and booleans as `"true"`/`1`. A value that
//! cannot be coerced is skipped with a warning.

use super::{ConfigError, ConfigResult, GatewayConfig};
use log::warn;
use serde_json::{Map, Value};
use std::path::Path;

/// Read `path` and apply its keys to `config`. A missing file is not an error.
pub fn apply_overlay_file(config: &mut GatewayConfig, path: &Path) -> ConfigResult<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let unreadable = |reason: String| ConfigError::FileUnreadable {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| unreadable(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(apply_overlay(config, &map)),
        _ => Err(unreadable("top-level value is not an object".to_string())),
    }
}

/// Apply every recognised key in `overlay`. Returns how many keys were applied.
pub fn apply_overlay(config: &mut GatewayConfig, overlay: &Map<String, Value>) -> usize {
    let mut applied = 0;
    for (key, value) in overlay {
        let ok = match key.as_str() {
            "HOST" => set(&mut config.host, as_string(value)),
            "PORT" => set(&mut config.port, as_int(value).and_then(|v| u16::try_from(v).ok())),
            "LOG_LEVEL" => set(&mut config.log_level, as_string(value)),
            "CORS_ORIGINS" => set(&mut config.cors_origins, as_string_list(value)),
            "MAX_PAYLOAD_SIZE" => set(
                &mut config.max_payload_size,
                as_int(value).and_then(|v| usize::try_from(v).ok()),
            ),
            "COZE_API_TOKEN" => set(&mut config.coze.api_token, as_string(value).map(Some)),
            "COZE_API_BASE" => set(&mut config.coze.api_base, as_string(value)),
            "COZE_BOT_ID" => set(&mut config.coze.bot_id, as_string(value).map(Some)),
            "COZE_TIMEOUT_SEC" => set(
                &mut config.coze.timeout_secs,
                as_int(value).and_then(|v| u64::try_from(v).ok()),
            ),
            "UPSTREAM_API_BASE" => set(&mut config.upstream.api_base, as_string(value).map(Some)),
            "UPSTREAM_CHAT_PATH" => set(&mut config.upstream.chat_path, as_string(value)),
            "UPSTREAM_API_KEY" => set(&mut config.upstream.api_key, as_string(value).map(Some)),
            "UPSTREAM_TIMEOUT_SEC" => set(
                &mut config.upstream.timeout_secs,
                as_int(value).and_then(|v| u64::try_from(v).ok()),
            ),
            "UPSTREAM_ENABLE_SSE" => set(&mut config.upstream.enable_sse, as_bool(value)),
            "DEFAULT_MODEL" => set(&mut config.defaults.model, as_string(value)),
            "DEFAULT_TEMPERATURE" => set(&mut config.defaults.temperature, as_float(value)),
            _ => continue,
        };
        if ok {
            applied += 1;
        } else {
            warn!("Ignoring config overlay key {}: cannot use value {}", key, value);
        }
    }
    applied
}

fn set<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Comma-separated string or array of strings.
fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(s.split(',').map(|o| o.trim().to_string()).collect()),
        Value::Array(items) => items.iter().map(|v| v.as_str().map(String::from)).collect(),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

use crate::error::ValidationError;
use crate::io_struct::{ChatRequest, Language, MAX_MESSAGE_LENGTH, TuningParams};
use serde_json::Value;

/// Turn an inbound JSON body into a canonical [`ChatRequest`].
///
/// The message is trimmed and must hold 1..=1000 characters. A missing or
/// null `language` defaults to `zh`; any other value outside the supported set
/// is rejected. A missing or empty `user_id` is replaced by a fresh UUID.
/// Tuning fields are copied as-is; the upstream owns their range checks.
pub fn validate(raw: &Value) -> Result<ChatRequest, ValidationError> {
    let message = raw
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if message.is_empty() {
        return Err(ValidationError::MissingField { field: "message" });
    }
    let length = message.chars().count();
    if length > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_MESSAGE_LENGTH,
            actual: length,
        });
    }

    let language = match raw.get("language") {
        None | Some(Value::Null) => Language::default(),
        Some(Value::String(code)) => Language::parse(code).ok_or_else(|| {
            ValidationError::UnsupportedLanguage {
                value: code.clone(),
            }
        })?,
        Some(other) => {
            return Err(ValidationError::UnsupportedLanguage {
                value: other.to_string(),
            });
        }
    };

    let user_id = match raw.get("user_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    };

    let stream = raw.get("stream").and_then(Value::as_bool).unwrap_or(false);

    Ok(ChatRequest::new(
        message.to_string(),
        user_id,
        language,
        stream,
        tuning_params(raw),
    ))
}

fn tuning_params(raw: &Value) -> TuningParams {
    let field = |key: &str| raw.get(key).cloned();
    TuningParams {
        model: field("model"),
        temperature: field("temperature"),
        max_tokens: field("max_tokens"),
        top_p: field("top_p"),
        stop: field("stop"),
        presence_penalty: field("presence_penalty"),
        frequency_penalty: field("frequency_penalty"),
    }
}

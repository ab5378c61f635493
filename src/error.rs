//! Error taxonomy and the `{code, message, details}` envelope every failing
//! response carries.

use crate::io_struct::Language;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Terminal error body returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl ErrorEnvelope {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Empty detail maps are dropped so the field is omitted from the body.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = match details {
            Value::Object(map) if !map.is_empty() => Some(map),
            _ => None,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing or empty {field}")]
    MissingField { field: &'static str },

    #[error("Message too long (max {max} characters)")]
    TooLong { max: usize, actual: usize },

    #[error("Unsupported language: {value}")]
    UnsupportedLanguage { value: String },
}

/// Failures of the event-stream assistant provider. The gateway never shows
/// these to callers; they only trigger fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant provider unavailable: {0}")]
    Unavailable(String),

    #[error("assistant transport error: {0}")]
    Transport(String),

    #[error("assistant protocol error: {0}")]
    Protocol(String),
}

/// Failures of the completions (REST/SSE) upstream.
#[derive(Debug, thiserror::Error)]
pub enum CompletionsError {
    #[error("Upstream not configured: {0}")]
    NotConfigured(String),

    #[error("Upstream timeout")]
    Timeout,

    #[error("Upstream request error: {0}")]
    Transport(String),

    #[error("Upstream responded with status {status}")]
    Upstream { status: u16, body: Value },

    #[error("Invalid upstream JSON")]
    InvalidBody { text: String },
}

impl CompletionsError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionsError::Timeout
        } else {
            CompletionsError::Transport(err.to_string())
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CompletionsError::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            CompletionsError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CompletionsError::Transport(_) => StatusCode::BAD_GATEWAY,
            CompletionsError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            CompletionsError::InvalidBody { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Everything a request handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Payload too large: exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Completions(#[from] CompletionsError),

    #[error("Not Found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn envelope(&self) -> ErrorEnvelope {
        let code = self.status_code().as_u16();
        match self {
            GatewayError::Validation(err) => validation_envelope(code, err),
            GatewayError::InvalidJson(_) => ErrorEnvelope::new(code, "Invalid JSON body"),
            GatewayError::PayloadTooLarge { limit } => {
                ErrorEnvelope::new(code, "Payload too large").with_details(json!({ "limit": limit }))
            }
            GatewayError::Completions(err) => completions_envelope(code, err),
            GatewayError::NotFound => ErrorEnvelope::new(code, "Not Found"),
            GatewayError::Internal(_) => ErrorEnvelope::new(code, "Internal Server Error"),
        }
    }
}

fn validation_envelope(code: u16, err: &ValidationError) -> ErrorEnvelope {
    match err {
        ValidationError::MissingField { .. } => ErrorEnvelope::new(code, err.to_string()),
        ValidationError::TooLong { max, actual } => ErrorEnvelope::new(code, err.to_string())
            .with_details(json!({ "maxLength": max, "actualLength": actual })),
        ValidationError::UnsupportedLanguage { .. } => {
            let supported = Language::supported_codes();
            ErrorEnvelope::new(
                code,
                format!("Unsupported language. Supported: {}", supported.join(", ")),
            )
            .with_details(json!({ "supported": supported }))
        }
    }
}

fn completions_envelope(code: u16, err: &CompletionsError) -> ErrorEnvelope {
    match err {
        CompletionsError::NotConfigured(hint) => {
            ErrorEnvelope::new(code, "Upstream not configured").with_details(json!({ "hint": hint }))
        }
        CompletionsError::Timeout => ErrorEnvelope::new(code, "Upstream timeout"),
        CompletionsError::Transport(e) => {
            ErrorEnvelope::new(code, "Upstream request error").with_details(json!({ "error": e }))
        }
        CompletionsError::Upstream { body, .. } => {
            ErrorEnvelope::new(code, "Upstream error").with_details(json!({ "upstream": body }))
        }
        CompletionsError::InvalidBody { text } => {
            ErrorEnvelope::new(code, "Invalid upstream JSON").with_details(json!({ "text": text }))
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Completions(err) => err.status(),
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let GatewayError::Internal(detail) = self {
            log::error!("Internal server error: {}", detail);
        }
        HttpResponse::build(self.status_code()).json(self.envelope())
    }
}

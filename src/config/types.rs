use super::{ConfigError, ConfigResult};
use crate::io_struct::{Language, MAX_MESSAGE_LENGTH, PublicConfig, PublicDefaults};
use std::time::Duration;

/// Process-wide gateway configuration. Built once at startup and shared
/// read-only behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Maximum JSON payload size in bytes
    pub max_payload_size: usize,
    /// Origins allowed by CORS; `*` allows any origin
    pub cors_origins: Vec<String>,
    pub coze: CozeConfig,
    pub upstream: UpstreamConfig,
    pub defaults: ModelDefaults,
}

/// Event-stream assistant provider settings
#[derive(Clone, PartialEq)]
pub struct CozeConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub bot_id: Option<String>,
    pub timeout_secs: u64,
}

/// Completions upstream (REST/SSE) settings
#[derive(Clone, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL; `None` means the upstream is not configured
    pub api_base: Option<String>,
    /// Path appended to the base URL
    pub chat_path: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Server-side switch; callers can only stream when this is on
    pub enable_sse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefaults {
    pub model: String,
    pub temperature: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            max_payload_size: 1024 * 1024,
            cors_origins: vec!["*".to_string()],
            coze: CozeConfig::default(),
            upstream: UpstreamConfig::default(),
            defaults: ModelDefaults::default(),
        }
    }
}

impl Default for CozeConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: "https://api.coze.cn".to_string(),
            bot_id: None,
            timeout_secs: 30,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            chat_path: "/api/chat/completions".to_string(),
            api_key: None,
            timeout_secs: 30,
            enable_sse: false,
        }
    }
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            model: "auto".to_string(),
            temperature: 0.7,
        }
    }
}

// Credentials stay out of Debug output.
impl std::fmt::Debug for CozeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CozeConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("bot_id", &self.bot_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_base", &self.api_base)
            .field("chat_path", &self.chat_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("enable_sse", &self.enable_sse)
            .finish()
    }
}

impl CozeConfig {
    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl UpstreamConfig {
    pub fn is_configured(&self) -> bool {
        self.api_base.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full chat endpoint, or `None` when no base URL is set
    pub fn chat_url(&self) -> Option<String> {
        self.api_base
            .as_ref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), self.chat_path))
    }
}

impl GatewayConfig {
    /// Treat empty credential and URL strings as unset.
    pub fn normalized(mut self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        self.coze.api_token = non_empty(self.coze.api_token);
        self.coze.bot_id = non_empty(self.coze.bot_id);
        self.upstream.api_base = non_empty(self.upstream.api_base);
        self.upstream.api_key = non_empty(self.upstream.api_key);
        self.cors_origins = self
            .cors_origins
            .iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (field, secs) in [
            ("COZE_TIMEOUT_SEC", self.coze.timeout_secs),
            ("UPSTREAM_TIMEOUT_SEC", self.upstream.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: secs.to_string(),
                    reason: "Must be > 0".to_string(),
                });
            }
        }

        if !self.defaults.temperature.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_TEMPERATURE".to_string(),
                value: self.defaults.temperature.to_string(),
                reason: "Must be a finite number".to_string(),
            });
        }

        if !self.upstream.chat_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "UPSTREAM_CHAT_PATH".to_string(),
                value: self.upstream.chat_path.clone(),
                reason: "Must start with '/'".to_string(),
            });
        }

        for origin in self.cors_origins.iter().filter(|o| o.as_str() != "*") {
            let valid = origin
                .parse::<actix_web::http::Uri>()
                .is_ok_and(|uri| uri.scheme().is_some() && uri.host().is_some());
            if !valid {
                return Err(ConfigError::InvalidValue {
                    field: "CORS_ORIGINS".to_string(),
                    value: origin.clone(),
                    reason: "Must be '*' or an origin like https://example.com".to_string(),
                });
            }
        }

        if self.max_payload_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_PAYLOAD_SIZE".to_string(),
                value: "0".to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn public_config(&self) -> PublicConfig {
        PublicConfig {
            upstream_configured: self.upstream.is_configured(),
            enable_sse: self.upstream.enable_sse,
            timeout_sec: self.upstream.timeout_secs,
            coze_configured: self.coze.is_configured(),
            chat_enabled: true,
            max_message_length: MAX_MESSAGE_LENGTH,
            supported_languages: Language::supported_codes()
                .into_iter()
                .map(String::from)
                .collect(),
            defaults: PublicDefaults {
                model: self.defaults.model.clone(),
                temperature: self.defaults.temperature,
            },
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Sentinel reported as `model` for replies produced by the assistant provider.
pub const ASSISTANT_MODEL: &str = "coze";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
    Ja,
}

impl Language {
    pub const SUPPORTED: [Language; 3] = [Language::Zh, Language::En, Language::Ja];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::SUPPORTED.into_iter().find(|l| l.as_str() == code)
    }

    pub fn supported_codes() -> Vec<&'static str> {
        Self::SUPPORTED.iter().map(Language::as_str).collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional sampling fields forwarded to the completions upstream untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuningParams {
    pub model: Option<Value>,
    pub temperature: Option<Value>,
    pub max_tokens: Option<Value>,
    pub top_p: Option<Value>,
    pub stop: Option<Value>,
    pub presence_penalty: Option<Value>,
    pub frequency_penalty: Option<Value>,
}

impl TuningParams {
    /// Fields merged into the upstream payload only when the caller set them.
    pub fn extras(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        [
            ("max_tokens", &self.max_tokens),
            ("top_p", &self.top_p),
            ("stop", &self.stop),
            ("presence_penalty", &self.presence_penalty),
            ("frequency_penalty", &self.frequency_penalty),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
    }
}

/// Canonical chat request. Only the validator builds one, so every instance
/// holds a trimmed message of 1..=1000 characters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    message: String,
    user_id: String,
    language: Language,
    stream: bool,
    tuning: TuningParams,
}

impl ChatRequest {
    pub(crate) fn new(
        message: String,
        user_id: String,
        language: Language,
        stream: bool,
        tuning: TuningParams,
    ) -> Self {
        Self {
            message,
            user_id,
            language,
            stream,
            tuning,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_stream(&self) -> bool {
        self.stream
    }

    pub fn tuning(&self) -> &TuningParams {
        &self.tuning
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResult {
    pub text: String,
    pub token_count: u64,
    pub model: String,
    pub language: Language,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    pub token_count: u64,
}

/// Body returned for a reply assembled from the assistant provider.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionBody {
    pub response: String,
    pub usage: Usage,
    pub model: String,
    pub language: Language,
}

impl From<ChatResult> for ChatCompletionBody {
    fn from(result: ChatResult) -> Self {
        ChatCompletionBody {
            response: result.text,
            usage: Usage {
                token_count: result.token_count,
            },
            model: result.model,
            language: result.language,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpstreamMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

/// OpenAI-style payload sent to the completions upstream. `extra` carries the
/// optional tuning fields flattened next to the fixed ones.
#[derive(Debug, Serialize)]
pub struct UpstreamChatPayload<'a> {
    pub model: Value,
    pub temperature: Value,
    pub messages: Vec<UpstreamMessage<'a>>,
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicDefaults {
    pub model: String,
    pub temperature: f64,
}

/// Snapshot of the configuration that is safe to show to browsers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub upstream_configured: bool,
    #[serde(rename = "enableSSE")]
    pub enable_sse: bool,
    pub timeout_sec: u64,
    pub coze_configured: bool,
    pub chat_enabled: bool,
    pub max_message_length: usize,
    pub supported_languages: Vec<String>,
    pub defaults: PublicDefaults,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub service: &'static str,
    pub config: PublicConfig,
}

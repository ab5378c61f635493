//! HTTP client for the Coze chat v3 streaming API.

use super::assistant::{EventSource, EventStream, UpstreamEvent};
use crate::config::CozeConfig;
use crate::error::AssistantError;
use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use futures::{StreamExt, future};
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CHAT_PATH: &str = "/v3/chat";

const EVENT_MESSAGE_DELTA: &str = "conversation.message.delta";
const EVENT_CHAT_COMPLETED: &str = "conversation.chat.completed";
const EVENT_CHAT_FAILED: &str = "conversation.chat.failed";
const EVENT_ERROR: &str = "error";
const EVENT_DONE: &str = "done";

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    bot_id: &'a str,
    user_id: &'a str,
    stream: bool,
    auto_save_history: bool,
    additional_messages: [AdditionalMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct AdditionalMessage<'a> {
    role: &'static str,
    content: &'a str,
    content_type: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct DeltaData {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ChatData {
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    last_error: Option<ApiError>,
}

/// `{code, msg}` shape used by both JSON error replies and error events.
#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Clone)]
pub struct CozeClient {
    client: reqwest::Client,
    api_base: String,
    api_token: String,
    bot_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for CozeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CozeClient")
            .field("api_base", &self.api_base)
            .field("bot_id", &self.bot_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CozeClient {
    pub fn new(config: &CozeConfig) -> Result<Self, AssistantError> {
        let api_token = config
            .api_token
            .clone()
            .ok_or_else(|| AssistantError::Unavailable("COZE_API_TOKEN is not set".into()))?;
        let bot_id = config
            .bot_id
            .clone()
            .ok_or_else(|| AssistantError::Unavailable("COZE_BOT_ID is not set".into()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| AssistantError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token,
            bot_id,
            timeout: config.timeout(),
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.api_base, CHAT_PATH)
    }
}

#[async_trait]
impl EventSource for CozeClient {
    async fn open(&self, user_id: &str, message: &str) -> Result<EventStream, AssistantError> {
        let body = ChatBody {
            bot_id: &self.bot_id,
            user_id,
            stream: true,
            auto_save_history: true,
            additional_messages: [AdditionalMessage {
                role: "user",
                content: message,
                content_type: "text",
                kind: "question",
            }],
        };
        let resp = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if !status.is_success() || is_json {
            let text = resp.text().await.unwrap_or_default();
            let api_error: ApiError = serde_json::from_str(&text).unwrap_or_default();
            return Err(AssistantError::Protocol(format!(
                "status {} code {}: {}",
                status.as_u16(),
                api_error.code,
                if api_error.msg.is_empty() { text } else { api_error.msg }
            )));
        }

        let events = resp
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                future::ready(!matches!(event, Ok(event) if event.event == EVENT_DONE))
            })
            .filter_map(|event| async move {
                match event {
                    Ok(event) => to_upstream_event(&event),
                    Err(e) => Some(Err(AssistantError::Transport(e.to_string()))),
                }
            });
        Ok(Box::pin(events))
    }
}

/// Map one server-sent event. `None` means the event carries nothing the
/// aggregator needs.
fn to_upstream_event(event: &Event) -> Option<Result<UpstreamEvent, AssistantError>> {
    match event.event.as_str() {
        EVENT_MESSAGE_DELTA => Some(
            parse::<DeltaData>(event)
                .map(|data| UpstreamEvent::Delta {
                    content: data.content,
                }),
        ),
        EVENT_CHAT_COMPLETED => Some(parse::<ChatData>(event).map(|data| {
            UpstreamEvent::Completed {
                token_count: data.usage.unwrap_or_default().token_count,
            }
        })),
        EVENT_CHAT_FAILED => {
            let error = parse::<ChatData>(event)
                .ok()
                .and_then(|data| data.last_error)
                .unwrap_or_default();
            Some(Err(AssistantError::Protocol(format!(
                "chat failed with code {}: {}",
                error.code, error.msg
            ))))
        }
        EVENT_ERROR => {
            let error = parse::<ApiError>(event).unwrap_or_default();
            Some(Err(AssistantError::Protocol(format!(
                "stream error {}: {}",
                error.code,
                if error.msg.is_empty() { &event.data } else { &error.msg }
            ))))
        }
        other => {
            debug!("Skipping assistant event {}", other);
            None
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(event: &Event) -> Result<T, AssistantError> {
    serde_json::from_str(&event.data).map_err(|e| {
        AssistantError::Protocol(format!("malformed {} payload: {}", event.event, e))
    })
}

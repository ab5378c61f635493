use super::AssistantProvider;
use super::coze::CozeClient;
use crate::config::GatewayConfig;
use crate::error::AssistantError;
use crate::io_struct::{ASSISTANT_MODEL, ChatRequest, ChatResult};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;

/// One event of a conversational reply, in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    Delta { content: String },
    Completed { token_count: u64 },
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<UpstreamEvent, AssistantError>> + Send>>;

/// Opens a single conversational turn and yields its events.
#[async_trait]
pub trait EventSource: Send + Sync + Debug {
    async fn open(&self, user_id: &str, message: &str) -> Result<EventStream, AssistantError>;
}

#[derive(Debug, Default, PartialEq)]
pub struct Aggregated {
    pub text: String,
    pub token_count: u64,
}

/// Drain `events` in order. Deltas are concatenated as-is; the first
/// `Completed` event sets the token count and ends consumption. A stream that
/// ends without one reports 0 tokens.
pub async fn aggregate_events(mut events: EventStream) -> Result<Aggregated, AssistantError> {
    let mut aggregated = Aggregated::default();
    while let Some(event) = events.next().await {
        match event? {
            UpstreamEvent::Delta { content } => aggregated.text.push_str(&content),
            UpstreamEvent::Completed { token_count } => {
                aggregated.token_count = token_count;
                break;
            }
        }
    }
    Ok(aggregated)
}

/// Assistant provider that fully aggregates an event stream before replying.
#[derive(Debug, Clone)]
pub struct EventStreamAdapter {
    source: Arc<dyn EventSource>,
}

impl EventStreamAdapter {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Build the adapter around a [`CozeClient`]. Fails with `Unavailable`
    /// when the token or bot id is missing.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, AssistantError> {
        let client = CozeClient::new(&config.coze)?;
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl AssistantProvider for EventStreamAdapter {
    fn name(&self) -> &'static str {
        ASSISTANT_MODEL
    }

    async fn invoke(&self, req: &ChatRequest) -> Result<ChatResult, AssistantError> {
        let events = self.source.open(req.user_id(), req.message()).await?;
        let aggregated = aggregate_events(events).await?;
        Ok(ChatResult {
            text: aggregated.text,
            token_count: aggregated.token_count,
            model: ASSISTANT_MODEL.to_string(),
            language: req.language(),
        })
    }
}

//! Upstream chat providers
//!
//! Two seams are exposed so the gateway can be assembled from real HTTP
//! clients at startup or from fakes in tests:
//! - [`AssistantProvider`]: produces one aggregated [`ChatResult`] per call
//! - [`CompletionsProvider`]: forwards to an OpenAI-style endpoint, buffered
//!   or as a relayed event stream

use crate::error::{AssistantError, CompletionsError};
use crate::io_struct::{ChatRequest, ChatResult};
use crate::relay::LineRelay;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

pub mod assistant;
pub mod completions;
pub mod coze;

pub use assistant::{EventSource, EventStream, EventStreamAdapter, UpstreamEvent};
pub use completions::CompletionsClient;
pub use coze::CozeClient;

#[async_trait]
pub trait AssistantProvider: Send + Sync + Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn invoke(&self, req: &ChatRequest) -> Result<ChatResult, AssistantError>;
}

/// Reply of the completions upstream
#[derive(Debug)]
pub enum CompletionsReply {
    /// Parsed JSON body, forwarded to the caller unchanged
    Buffered(Value),
    /// Live event stream, relayed line by line
    Stream(LineRelay),
}

#[async_trait]
pub trait CompletionsProvider: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// `want_stream` is the caller's intent; implementations decide whether
    /// streaming is actually honoured.
    async fn invoke(
        &self,
        req: &ChatRequest,
        want_stream: bool,
    ) -> Result<CompletionsReply, CompletionsError>;
}

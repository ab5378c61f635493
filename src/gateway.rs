//! Provider selection and fallback.
//!
//! A request runs through at most two attempts: the assistant provider when
//! one is configured, then the completions upstream. Each attempt reports an
//! [`Attempt`], so the policy below is plain control flow over tagged values.

use crate::error::{AssistantError, CompletionsError};
use crate::io_struct::{ChatRequest, ChatResult};
use crate::providers::{AssistantProvider, CompletionsProvider, CompletionsReply};
use crate::relay::LineRelay;
use log::warn;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Outcome of one provider attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    Ok(T),
    /// Recoverable; the next step of the pipeline runs.
    SoftFail(E),
    /// Terminal; surfaced to the caller.
    HardFail(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPath {
    Assistant,
    Completions,
}

impl fmt::Display for ProviderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderPath::Assistant => f.write_str("coze"),
            ProviderPath::Completions => f.write_str("upstream"),
        }
    }
}

#[derive(Debug)]
pub enum GatewayReply {
    /// Aggregated assistant reply
    Assistant(ChatResult),
    /// Upstream JSON body, forwarded unchanged
    Upstream(Value),
    /// Relayed upstream event stream
    Stream(LineRelay),
}

#[derive(Debug)]
pub struct Outcome {
    pub path: ProviderPath,
    /// The assistant provider was tried and failed
    pub fallback: bool,
    pub reply: Result<GatewayReply, CompletionsError>,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    assistant: Option<Arc<dyn AssistantProvider>>,
    completions: Arc<dyn CompletionsProvider>,
}

impl Gateway {
    pub fn new(
        assistant: Option<Arc<dyn AssistantProvider>>,
        completions: Arc<dyn CompletionsProvider>,
    ) -> Self {
        Self {
            assistant,
            completions,
        }
    }

    pub fn has_assistant(&self) -> bool {
        self.assistant.is_some()
    }

    /// `None` when no assistant provider is configured. Every assistant
    /// failure is soft.
    pub async fn attempt_assistant(
        &self,
        req: &ChatRequest,
    ) -> Option<Attempt<ChatResult, AssistantError>> {
        let assistant = self.assistant.as_ref()?;
        Some(match assistant.invoke(req).await {
            Ok(result) => Attempt::Ok(result),
            Err(err) => {
                warn!("Provider {} failed: {}", assistant.name(), err);
                Attempt::SoftFail(err)
            }
        })
    }

    /// Every completions failure is hard. The assistant path never streams,
    /// so the caller's stream intent only reaches this step.
    pub async fn attempt_completions(
        &self,
        req: &ChatRequest,
    ) -> Attempt<CompletionsReply, CompletionsError> {
        match self.completions.invoke(req, req.is_stream()).await {
            Ok(reply) => Attempt::Ok(reply),
            Err(err) => Attempt::HardFail(err),
        }
    }

    pub async fn complete(&self, req: &ChatRequest) -> Outcome {
        let mut fallback = false;
        match self.attempt_assistant(req).await {
            Some(Attempt::Ok(result)) => {
                return Outcome {
                    path: ProviderPath::Assistant,
                    fallback,
                    reply: Ok(GatewayReply::Assistant(result)),
                };
            }
            Some(Attempt::SoftFail(_)) | Some(Attempt::HardFail(_)) => {
                warn!("Falling back to {}", self.completions.name());
                fallback = true;
            }
            None => {}
        }

        let reply = match self.attempt_completions(req).await {
            Attempt::Ok(CompletionsReply::Buffered(body)) => Ok(GatewayReply::Upstream(body)),
            Attempt::Ok(CompletionsReply::Stream(relay)) => Ok(GatewayReply::Stream(relay)),
            Attempt::SoftFail(err) | Attempt::HardFail(err) => Err(err),
        };
        Outcome {
            path: ProviderPath::Completions,
            fallback,
            reply,
        }
    }
}

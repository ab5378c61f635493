use super::{CompletionsProvider, CompletionsReply};
use crate::config::{GatewayConfig, ModelDefaults, UpstreamConfig};
use crate::error::CompletionsError;
use crate::io_struct::{ChatRequest, UpstreamChatPayload, UpstreamMessage};
use crate::relay::LineRelay;
use async_trait::async_trait;
use log::info;
use serde_json::{Map, Value};

/// Client for an OpenAI-style completions endpoint.
#[derive(Debug, Clone)]
pub struct CompletionsClient {
    client: reqwest::Client,
    upstream: UpstreamConfig,
    defaults: ModelDefaults,
}

impl CompletionsClient {
    /// Connect and per-read deadlines come from the upstream timeout, so a
    /// relayed stream may run longer than the timeout as long as it keeps
    /// producing data.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.upstream.timeout())
            .read_timeout(config.upstream.timeout())
            .build()?;
        Ok(Self {
            client,
            upstream: config.upstream.clone(),
            defaults: config.defaults.clone(),
        })
    }

    /// Streaming is honoured only when the caller asks for it and the
    /// server-side switch allows it.
    pub fn effective_stream(&self, want_stream: bool) -> bool {
        want_stream && self.upstream.enable_sse
    }
}

/// Build the upstream payload: the caller's message as the only user turn,
/// `model`/`temperature` defaulted, other tuning fields merged when present.
pub fn build_payload<'a>(
    req: &'a ChatRequest,
    defaults: &ModelDefaults,
    stream: bool,
) -> UpstreamChatPayload<'a> {
    let tuning = req.tuning();
    let model = match &tuning.model {
        None | Some(Value::Null) => Value::String(defaults.model.clone()),
        Some(Value::String(s)) if s.is_empty() => Value::String(defaults.model.clone()),
        Some(model) => model.clone(),
    };
    let temperature = match &tuning.temperature {
        None | Some(Value::Null) => Value::from(defaults.temperature),
        Some(temperature) => temperature.clone(),
    };
    let extra: Map<String, Value> = tuning
        .extras()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();

    UpstreamChatPayload {
        model,
        temperature,
        messages: vec![UpstreamMessage {
            role: "user",
            content: req.message(),
        }],
        stream,
        extra,
    }
}

/// Classify a fully read upstream body.
pub fn interpret_body(status: u16, text: String) -> Result<Value, CompletionsError> {
    let parsed = serde_json::from_str::<Value>(&text);
    if status >= 400 {
        let body = parsed.unwrap_or(Value::String(text));
        return Err(CompletionsError::Upstream { status, body });
    }
    parsed.map_err(|_| CompletionsError::InvalidBody { text })
}

#[async_trait]
impl CompletionsProvider for CompletionsClient {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn invoke(
        &self,
        req: &ChatRequest,
        want_stream: bool,
    ) -> Result<CompletionsReply, CompletionsError> {
        let url = self.upstream.chat_url().ok_or_else(|| {
            CompletionsError::NotConfigured("UPSTREAM_API_BASE is empty".to_string())
        })?;
        let stream = self.effective_stream(want_stream);
        let payload = build_payload(req, &self.defaults, stream);

        info!("Proxying chat: stream={}", stream);
        let mut request = self.client.post(url).json(&payload);
        if let Some(key) = &self.upstream.api_key {
            request = request.bearer_auth(key);
        }
        if !stream {
            request = request.timeout(self.upstream.timeout());
        }
        let resp = request.send().await.map_err(CompletionsError::from_reqwest)?;
        let status = resp.status().as_u16();

        if stream && status < 400 {
            return Ok(CompletionsReply::Stream(LineRelay::spawn(resp.bytes_stream())));
        }

        let text = resp.text().await.map_err(CompletionsError::from_reqwest)?;
        interpret_body(status, text).map(CompletionsReply::Buffered)
    }
}

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::providers::{
    AssistantProvider, CompletionsClient, CompletionsProvider, EventStreamAdapter,
};
use log::{info, warn};
use std::sync::Arc;

/// Per-process state shared by every request handler.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub gateway: Gateway,
}

impl GatewayState {
    /// Build the providers once from `config`. An assistant provider that
    /// cannot be built leaves the gateway in completions-only mode.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let assistant: Option<Arc<dyn AssistantProvider>> = if config.coze.is_configured() {
            match EventStreamAdapter::from_config(&config) {
                Ok(adapter) => Some(Arc::new(adapter)),
                Err(e) => {
                    warn!("Assistant provider disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let completions = Arc::new(CompletionsClient::new(&config)?);

        info!(
            "Gateway providers: assistant={} upstream_configured={} enable_sse={}",
            assistant.is_some(),
            config.upstream.is_configured(),
            config.upstream.enable_sse
        );
        Ok(Self::with_providers(config, assistant, completions))
    }

    pub fn with_providers(
        config: GatewayConfig,
        assistant: Option<Arc<dyn AssistantProvider>>,
        completions: Arc<dyn CompletionsProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Gateway::new(assistant, completions),
        }
    }
}

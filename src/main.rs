use chat_gateway::config::{
    ConfigResult, CozeConfig, GatewayConfig, ModelDefaults, UpstreamConfig, apply_overlay_file,
};
use chat_gateway::gateway_state::GatewayState;
use chat_gateway::logging::init_logging;
use chat_gateway::server::startup;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use log::{info, warn};
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "chat-gateway")]
#[command(
    about = "Chat gateway - one chat endpoint in front of an assistant API and a completions upstream"
)]
struct CliArgs {
    /// Host address to bind the server
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Maximum JSON payload size in bytes
    #[arg(long, env = "MAX_PAYLOAD_SIZE", default_value_t = 1024 * 1024)]
    max_payload_size: usize,

    /// Comma-separated origins allowed by CORS; `*` allows any origin
    #[arg(long, env = "CORS_ORIGINS", default_value = "*", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Assistant API token; the assistant provider is disabled without it
    #[arg(long, env = "COZE_API_TOKEN", hide_env_values = true)]
    coze_api_token: Option<String>,

    /// Assistant API base URL
    #[arg(long, env = "COZE_API_BASE", default_value = "https://api.coze.cn")]
    coze_api_base: String,

    /// Assistant bot id
    #[arg(long, env = "COZE_BOT_ID")]
    coze_bot_id: Option<String>,

    /// Assistant request timeout in seconds
    #[arg(long, env = "COZE_TIMEOUT_SEC", default_value_t = 30)]
    coze_timeout_sec: u64,

    /// Completions upstream base URL
    #[arg(long, env = "UPSTREAM_API_BASE")]
    upstream_api_base: Option<String>,

    /// Path appended to the upstream base URL
    #[arg(long, env = "UPSTREAM_CHAT_PATH", default_value = "/api/chat/completions")]
    upstream_chat_path: String,

    /// Bearer token sent to the completions upstream
    #[arg(long, env = "UPSTREAM_API_KEY", hide_env_values = true)]
    upstream_api_key: Option<String>,

    /// Completions upstream timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SEC", default_value_t = 30)]
    upstream_timeout_sec: u64,

    /// Allow callers to request streamed replies
    #[arg(
        long,
        env = "UPSTREAM_ENABLE_SSE",
        default_value = "false",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    upstream_enable_sse: bool,

    /// Model sent upstream when the caller gives none
    #[arg(long, env = "DEFAULT_MODEL", default_value = "auto")]
    default_model: String,

    /// Temperature sent upstream when the caller gives none
    #[arg(long, env = "DEFAULT_TEMPERATURE", default_value_t = 0.7)]
    default_temperature: f64,

    /// JSON file whose keys override every other source
    #[arg(long, env = "GATEWAY_CONFIG_FILE", default_value = "config.json")]
    config_file: PathBuf,
}

impl CliArgs {
    fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            max_payload_size: self.max_payload_size,
            cors_origins: self.cors_origins.clone(),
            coze: CozeConfig {
                api_token: self.coze_api_token.clone(),
                api_base: self.coze_api_base.clone(),
                bot_id: self.coze_bot_id.clone(),
                timeout_secs: self.coze_timeout_sec,
            },
            upstream: UpstreamConfig {
                api_base: self.upstream_api_base.clone(),
                chat_path: self.upstream_chat_path.clone(),
                api_key: self.upstream_api_key.clone(),
                timeout_secs: self.upstream_timeout_sec,
                enable_sse: self.upstream_enable_sse,
            },
            defaults: ModelDefaults {
                model: self.default_model.clone(),
                temperature: self.default_temperature,
            },
        }
    }

    /// Layer the JSON file over the command line. A broken file is reported
    /// and skipped.
    fn load_config(&self) -> ConfigResult<(GatewayConfig, Option<String>)> {
        let mut config = self.to_gateway_config();
        let overlay_warning = apply_overlay_file(&mut config, &self.config_file)
            .err()
            .map(|e| e.to_string());
        let config = config.normalized();
        config.validate()?;
        Ok((config, overlay_warning))
    }
}

fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();
    let (config, overlay_warning) = cli_args.load_config()?;

    init_logging(&config.log_level);
    if let Some(warning) = overlay_warning {
        warn!("Ignoring config file: {}", warning);
    }
    info!("Config: {:?}", config);

    let app_state = GatewayState::new(config.clone())?;

    actix_web::rt::System::new().block_on(async move {
        tokio::select! {
            res = startup(config, app_state) => res,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                Ok(())
            }
        }
    })?;

    Ok(())
}

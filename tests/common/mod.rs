// Not every test binary uses every helper
#![allow(dead_code)]

pub mod mock_upstream;

use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::ServiceResponse;
use actix_web::{App, test as actix_test, web};
use chat_gateway::config::GatewayConfig;
use chat_gateway::gateway_state::GatewayState;
use chat_gateway::server::{configure, create_cors};

/// Config with no providers. Tests switch on what they need.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.host = "127.0.0.1".to_string();
    config.upstream.timeout_secs = 5;
    config.coze.timeout_secs = 5;
    config
}

pub fn with_upstream(mut config: GatewayConfig, base: &str) -> GatewayConfig {
    config.upstream.api_base = Some(base.to_string());
    config.upstream.chat_path = "/v1/chat/completions".to_string();
    config
}

pub fn with_coze(mut config: GatewayConfig, base: &str) -> GatewayConfig {
    config.coze.api_token = Some("test-token".to_string());
    config.coze.bot_id = Some("bot-1".to_string());
    config.coze.api_base = base.to_string();
    config
}

/// Build the app exactly as the server does and send one request through it.
pub async fn call(config: GatewayConfig, req: actix_test::TestRequest) -> ServiceResponse<EitherBody<BoxBody>> {
    let state = GatewayState::new(config).unwrap();
    call_with_state(state, req).await
}

pub async fn call_with_state(
    state: GatewayState,
    req: actix_test::TestRequest,
) -> ServiceResponse<EitherBody<BoxBody>> {
    let max_payload_size = state.config.max_payload_size;
    let cors_origins = state.config.cors_origins.clone();
    let app = actix_test::init_service(
        App::new()
            .wrap(create_cors(&cors_origins))
            .app_data(web::Data::new(state))
            .configure(|cfg| configure(cfg, max_payload_size)),
    )
    .await;
    actix_test::call_service(&app, req.to_request()).await
}

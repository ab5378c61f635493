use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{GatewayReply, Outcome};
use crate::gateway_state::GatewayState;
use crate::io_struct::{ChatCompletionBody, HealthBody};
use crate::validation::validate;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, HttpServer, ResponseError, error, get, post, web};
use futures::FutureExt;
use log::{info, warn};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;

#[get("/api/health")]
pub async fn health(app_state: web::Data<GatewayState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthBody {
        status: "ok",
        service: "chat-gateway",
        config: app_state.config.public_config(),
    })
}

#[get("/api/config/public")]
pub async fn config_public(app_state: web::Data<GatewayState>) -> HttpResponse {
    HttpResponse::Ok().json(app_state.config.public_config())
}

#[post("/api/chat/completions")]
pub async fn chat_completions(
    body: web::Json<Value>,
    app_state: web::Data<GatewayState>,
) -> Result<HttpResponse, GatewayError> {
    AssertUnwindSafe(handle_chat(body.into_inner(), app_state))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(GatewayError::Internal(panic_message(&*panic))))
}

async fn handle_chat(
    body: Value,
    app_state: web::Data<GatewayState>,
) -> Result<HttpResponse, GatewayError> {
    let request = match validate(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            return Err(e.into());
        }
    };

    let Outcome {
        path,
        fallback,
        reply,
    } = app_state.gateway.complete(&request).await;
    let status = match &reply {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    info!(
        "chat_completions user_id={} language={} provider={} fallback={} stream={} status={}",
        request.user_id(),
        request.language(),
        path,
        fallback,
        matches!(reply, Ok(GatewayReply::Stream(_))),
        status
    );

    match reply? {
        GatewayReply::Assistant(result) => {
            Ok(HttpResponse::Ok().json(ChatCompletionBody::from(result)))
        }
        GatewayReply::Upstream(body) => Ok(HttpResponse::Ok().json(body)),
        GatewayReply::Stream(relay) => Ok(HttpResponse::Ok()
            .content_type("text/event-stream")
            .streaming(relay)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}

async fn not_found() -> Result<HttpResponse, GatewayError> {
    Err(GatewayError::NotFound)
}

// Report JSON payload errors with the standard error envelope.
fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    let gateway_error = match &err {
        error::JsonPayloadError::OverflowKnownLength { limit, .. }
        | error::JsonPayloadError::Overflow { limit } => {
            GatewayError::PayloadTooLarge { limit: *limit }
        }
        _ => GatewayError::InvalidJson(err.to_string()),
    };
    warn!("JSON payload error: {}", err);
    error::InternalError::from_response(err, gateway_error.error_response()).into()
}

/// Register the gateway routes. Shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig, max_payload_size: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(max_payload_size)
            .content_type_required(false)
            .error_handler(json_error_handler),
    )
    .service(health)
    .service(config_public)
    .service(chat_completions)
    .default_service(web::to(not_found));
}

/// CORS policy for browser callers. `*` or an empty list allows any origin.
pub fn create_cors(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
    };
    cors.max_age(3600)
}

pub async fn startup(config: GatewayConfig, app_state: GatewayState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);
    let max_payload_size = config.max_payload_size;
    let cors_origins = config.cors_origins.clone();

    info!("Starting server at {}:{}", config.host, config.port);
    info!("CORS allowed origins: {:?}", cors_origins);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(create_cors(&cors_origins))
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(|cfg| configure(cfg, max_payload_size))
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}

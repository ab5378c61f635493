mod common;

use actix_web::http::StatusCode;
use actix_web::{rt::System, test as actix_test};
use async_trait::async_trait;
use chat_gateway::error::CompletionsError;
use chat_gateway::gateway_state::GatewayState;
use chat_gateway::io_struct::ChatRequest;
use chat_gateway::providers::{CompletionsProvider, CompletionsReply};
use common::{call, call_with_state, test_config, with_upstream};
use serde_json::{Value, json};
use std::sync::Arc;

#[cfg(test)]
mod info_endpoints {
    use super::*;

    #[test]
    fn test_health_reports_public_config() {
        System::new().block_on(async {
            let resp = call(
                test_config(),
                actix_test::TestRequest::get().uri("/api/health"),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);

            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "chat-gateway");
            assert_eq!(body["config"]["upstreamConfigured"], false);
            assert_eq!(body["config"]["chatEnabled"], true);
        });
    }

    #[test]
    fn test_public_config_shape() {
        System::new().block_on(async {
            let mut config = with_upstream(test_config(), "http://127.0.0.1:9");
            config.upstream.enable_sse = true;
            config.upstream.timeout_secs = 12;
            config.coze.api_token = Some("secret-token".to_string());

            let resp = call(
                config,
                actix_test::TestRequest::get().uri("/api/config/public"),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);

            let body = actix_test::read_body(resp).await;
            let text = String::from_utf8_lossy(&body);
            assert!(!text.contains("secret-token"));

            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(
                body,
                json!({
                    "upstreamConfigured": true,
                    "enableSSE": true,
                    "timeoutSec": 12,
                    "cozeConfigured": true,
                    "chatEnabled": true,
                    "maxMessageLength": 1000,
                    "supportedLanguages": ["zh", "en", "ja"],
                    "defaults": {"model": "auto", "temperature": 0.7}
                })
            );
        });
    }

    #[test]
    fn test_unknown_route_returns_envelope() {
        System::new().block_on(async {
            let resp = call(
                test_config(),
                actix_test::TestRequest::get().uri("/api/nope"),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body, json!({"code": 404, "message": "Not Found"}));
        });
    }
}

#[cfg(test)]
mod request_validation {
    use super::*;

    async fn post_chat(payload: Value) -> (StatusCode, Value) {
        let resp = call(
            test_config(),
            actix_test::TestRequest::post()
                .uri("/api/chat/completions")
                .set_json(&payload),
        )
        .await;
        let status = resp.status();
        (status, actix_test::read_body_json(resp).await)
    }

    #[test]
    fn test_missing_and_blank_message() {
        System::new().block_on(async {
            for payload in [json!({}), json!({"message": "   "}), json!({"message": 42})] {
                let (status, body) = post_chat(payload).await;
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(
                    body,
                    json!({"code": 400, "message": "Missing or empty message"})
                );
            }
        });
    }

    #[test]
    fn test_message_too_long() {
        System::new().block_on(async {
            let (status, body) = post_chat(json!({"message": "字".repeat(1001)})).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Message too long (max 1000 characters)");
            assert_eq!(
                body["details"],
                json!({"maxLength": 1000, "actualLength": 1001})
            );
        });
    }

    #[test]
    fn test_unsupported_language() {
        System::new().block_on(async {
            let (status, body) = post_chat(json!({"message": "hi", "language": "fr"})).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Unsupported language. Supported: zh, en, ja");
            assert_eq!(body["details"]["supported"], json!(["zh", "en", "ja"]));
        });
    }

    #[test]
    fn test_malformed_json_body() {
        System::new().block_on(async {
            let resp = call(
                test_config(),
                actix_test::TestRequest::post()
                    .uri("/api/chat/completions")
                    .insert_header(("content-type", "application/json"))
                    .set_payload("{\"message\": "),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body, json!({"code": 400, "message": "Invalid JSON body"}));
        });
    }

    #[test]
    fn test_body_without_content_type_is_accepted() {
        System::new().block_on(async {
            let resp = call(
                test_config(),
                actix_test::TestRequest::post()
                    .uri("/api/chat/completions")
                    .set_payload(r#"{"message": "hi"}"#),
            )
            .await;
            // Parsed and validated; fails later only because nothing is configured
            assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        });
    }

    #[test]
    fn test_payload_over_limit() {
        System::new().block_on(async {
            let mut config = test_config();
            config.max_payload_size = 64;
            let resp = call(
                config,
                actix_test::TestRequest::post()
                    .uri("/api/chat/completions")
                    .set_json(json!({"message": "x".repeat(200)})),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body["code"], 413);
        });
    }

    #[test]
    fn test_nothing_configured_returns_501() {
        System::new().block_on(async {
            let (status, body) = post_chat(json!({"message": "hi"})).await;
            assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
            assert_eq!(body["code"], 501);
            assert_eq!(body["message"], "Upstream not configured");
            assert!(body["details"]["hint"].is_string());
        });
    }
}

#[cfg(test)]
mod cors {
    use super::*;

    fn preflight(origin: &str) -> actix_test::TestRequest {
        actix_test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/chat/completions")
            .insert_header(("origin", origin))
            .insert_header(("access-control-request-method", "POST"))
            .insert_header(("access-control-request-headers", "content-type"))
    }

    #[test]
    fn test_preflight_allowed_by_default() {
        System::new().block_on(async {
            let resp = call(test_config(), preflight("http://localhost:3000")).await;
            assert!(resp.status().is_success());

            let headers = resp.headers();
            assert_eq!(
                headers.get("access-control-allow-origin").unwrap(),
                "http://localhost:3000"
            );
            assert!(headers.contains_key("access-control-allow-methods"));
        });
    }

    #[test]
    fn test_simple_request_carries_allow_origin() {
        System::new().block_on(async {
            let resp = call(
                test_config(),
                actix_test::TestRequest::get()
                    .uri("/api/health")
                    .insert_header(("origin", "http://localhost:3000")),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert!(resp.headers().contains_key("access-control-allow-origin"));
        });
    }

    #[test]
    fn test_configured_origins_are_enforced() {
        System::new().block_on(async {
            let mut config = test_config();
            config.cors_origins = vec!["https://chat.example.com".to_string()];

            let resp = call(config.clone(), preflight("https://chat.example.com")).await;
            assert!(resp.status().is_success());
            assert_eq!(
                resp.headers().get("access-control-allow-origin").unwrap(),
                "https://chat.example.com"
            );

            let resp = call(
                config,
                actix_test::TestRequest::get()
                    .uri("/api/health")
                    .insert_header(("origin", "https://evil.example")),
            )
            .await;
            assert!(!resp.headers().contains_key("access-control-allow-origin"));
        });
    }
}

#[cfg(test)]
mod handler_panics {
    use super::*;

    #[derive(Debug)]
    struct PanickingCompletions;

    #[async_trait]
    impl CompletionsProvider for PanickingCompletions {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn invoke(
            &self,
            _req: &ChatRequest,
            _want_stream: bool,
        ) -> Result<CompletionsReply, CompletionsError> {
            panic!("provider bug: secret-detail");
        }
    }

    #[test]
    fn test_panic_becomes_generic_500() {
        System::new().block_on(async {
            let state =
                GatewayState::with_providers(test_config(), None, Arc::new(PanickingCompletions));
            let resp = call_with_state(
                state,
                actix_test::TestRequest::post()
                    .uri("/api/chat/completions")
                    .set_json(json!({"message": "hi"})),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = actix_test::read_body(resp).await;
            assert!(!String::from_utf8_lossy(&body).contains("secret-detail"));
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body, json!({"code": 500, "message": "Internal Server Error"}));
        });
    }
}

//! Web server implementation for the interactions endpoint

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, time::Duration};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::interactions::handle_interaction;
use super::signature::{require_signature, SharedVerifier};
use super::verify_stub;
use crate::config::{BotConfig, TlsPaths};
use crate::managers::SharedVerificationManager;

/// Web server configuration
pub struct WebServerConfig {
    pub port: u16,
    /// Serve HTTPS with these files instead of plain HTTP
    pub tls: Option<TlsPaths>,
    /// Also serve the `/verify` stub
    pub verify_stub: bool,
}

impl WebServerConfig {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            port: config.port,
            tls: config.tls.clone(),
            verify_stub: config.verify_stub,
        }
    }
}

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub verification_manager: SharedVerificationManager,
}

/// Build the application router
pub fn build_router(state: AppState, verifier: SharedVerifier, verify_stub: bool) -> Router {
    let interactions = Router::new()
        .route("/interactions", post(handle_interaction))
        .route_layer(middleware::from_fn_with_state(verifier, require_signature))
        .with_state(state);

    let mut app = Router::new().route("/", get(health)).merge(interactions);
    if verify_stub {
        app = app.route("/verify", post(verify_stub::verify));
    }
    app.layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` flips to true
pub async fn start_web_server(
    config: WebServerConfig,
    app: Router,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to load TLS certificates: {}\n  Certificate: {}\n  Private key: {}",
                        e,
                        tls.cert_path.display(),
                        tls.key_path.display()
                    )
                })?;

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                wait_for_shutdown(shutdown).await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            info!("Web server listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Listening on port {}", config.port);
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(wait_for_shutdown(shutdown))
                .await?;
        }
    }

    info!("Web server stopped");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Health check endpoint
async fn health() -> &'static str {
    "Verification Bot Running"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelTarget, ResponseMode};
    use crate::managers::{
        create_shared_channel_manager, create_shared_role_manager,
        create_shared_verification_manager, VerificationSettings,
    };
    use crate::messages;
    use crate::scheduler::Scheduler;
    use crate::testing::{FakeGateway, FakeVerifier, VerifierMode, ALICE, MEMBER_ROLE};
    use crate::verification::client::VerificationClient;
    use crate::verification::HttpVerificationClient;
    use crate::web::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ed25519_dalek::{Signer, SigningKey};
    use serenity::interactions_endpoint::Verifier;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        gateway: Arc<FakeGateway>,
        verifier: Arc<FakeVerifier>,
        key: SigningKey,
    }

    fn test_app(mode: VerifierMode) -> TestApp {
        test_app_with(mode, true)
    }

    fn test_app_with(mode: VerifierMode, verify_stub: bool) -> TestApp {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let signature_verifier =
            Arc::new(Verifier::try_new(key.verifying_key().to_bytes()).unwrap());

        let gateway = FakeGateway::new();
        let verifier = FakeVerifier::new(mode);
        let settings = VerificationSettings {
            required_role: MEMBER_ROLE,
            response_mode: ResponseMode::Immediate,
            cleanup_messages: false,
            reward_url: None,
            reward_delay: Duration::from_secs(2),
            acquire_url: "https://example.com/buy".to_string(),
            acquire_label: "Buy".to_string(),
        };
        let manager = create_shared_verification_manager(
            settings,
            verifier.clone(),
            gateway.clone(),
            create_shared_role_manager(gateway.clone()),
            create_shared_channel_manager(gateway.clone(), ChannelTarget::SystemChannel),
            Scheduler::new(),
        );
        let state = AppState {
            verification_manager: manager,
        };

        TestApp {
            router: build_router(state, signature_verifier, verify_stub),
            gateway,
            verifier,
            key,
        }
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn signed_request(key: &SigningKey, body: &serde_json::Value) -> Request<Body> {
        let body = body.to_string();
        let timestamp = "1700000000";
        let signature = key.sign(format!("{}{}", timestamp, body).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, hex(&signature.to_bytes()))
            .header(TIMESTAMP_HEADER, timestamp)
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn verify_click() -> serde_json::Value {
        serde_json::json!({
            "type": 3,
            "data": {"custom_id": "verify_button"},
            "member": {"user": {"id": ALICE.to_string(), "username": "alice"}},
            "guild_id": "7",
            "token": "tok"
        })
    }

    #[tokio::test]
    async fn test_ping_returns_pong() {
        let app = test_app(VerifierMode::Approve);
        let request = signed_request(&app.key, &serde_json::json!({"type": 1}));

        let (status, body) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], 1);
    }

    #[tokio::test]
    async fn test_unsigned_request_rejected() {
        let app = test_app(VerifierMode::Approve);
        let request = Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json")
            .body(Body::from(verify_click().to_string()))
            .unwrap();

        let (status, _) = send(app.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_tampered_body_rejected() {
        let app = test_app(VerifierMode::Approve);
        let signed = signed_request(&app.key, &serde_json::json!({"type": 1}));
        let (parts, _) = signed.into_parts();
        let request = Request::from_parts(parts, Body::from(verify_click().to_string()));

        let (status, _) = send(app.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.gateway.add_role_calls(), 0);
    }

    #[tokio::test]
    async fn test_verify_click_grants_role() {
        let app = test_app(VerifierMode::Approve);
        let request = signed_request(&app.key, &verify_click());

        let (status, body) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], 7);
        assert_eq!(body["data"]["content"], messages::VERIFIED);
        assert_eq!(body["data"]["flags"], 64);
        assert_eq!(body["data"]["components"], serde_json::json!([]));
        assert_eq!(app.gateway.roles_of(ALICE), vec![MEMBER_ROLE]);
    }

    #[tokio::test]
    async fn test_discord_outage_answers_with_error_message() {
        let app = test_app(VerifierMode::Approve);
        app.gateway.with_guild(|g| g.fail_fetch = true);

        let (status, body) = send(app.router, signed_request(&app.key, &verify_click())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], 7);
        assert_eq!(body["data"]["content"], messages::VERIFICATION_ERROR);
        assert_eq!(body["data"]["flags"], 64);
        assert_eq!(app.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_command_is_bad_request() {
        let app = test_app(VerifierMode::Approve);
        let body = serde_json::json!({
            "type": 2,
            "data": {"name": "challenge"},
            "member": {"user": {"id": "42", "username": "alice"}},
            "guild_id": "7",
            "token": "tok"
        });

        let (status, json) = send(app.router, signed_request(&app.key, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Unknown command or interaction");
        assert_eq!(app.gateway.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_type_and_guild_are_bad_requests() {
        let app = test_app(VerifierMode::Approve);
        let (status, json) = send(
            app.router.clone(),
            signed_request(&app.key, &serde_json::json!({"type": 4})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Unknown interaction type");

        let mut body = verify_click();
        body["guild_id"] = serde_json::json!("999");
        let (status, json) = send(app.router, signed_request(&app.key, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Guild not found.");
    }

    #[tokio::test]
    async fn test_stub_approves_over_http() {
        let app = test_app(VerifierMode::Approve);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app.router;
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service()).await.unwrap();
        });

        let client = HttpVerificationClient::new(format!("http://{}/verify", addr));
        let outcome = client.verify(ALICE, "alice").await.unwrap();
        assert!(outcome.success);

        let missing = HttpVerificationClient::new(format!("http://{}/nope", addr));
        assert!(missing.verify(ALICE, "alice").await.is_err());
    }

    #[tokio::test]
    async fn test_stub_can_be_disabled() {
        let app = test_app_with(VerifierMode::Approve, false);
        let request = Request::builder()
            .method("POST")
            .uri("/verify")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"discordId":"42","username":"alice"}"#))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_is_unsigned() {
        let app = test_app(VerifierMode::Reject);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

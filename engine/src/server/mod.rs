//! Webhook HTTP Server
//!
//! Endpoints:
//! - GET /          - Service banner
//! - GET /health    - Health and session count
//! - GET /webhook   - Subscription handshake
//! - POST /webhook  - Inbound message notifications
//!
//! POST /webhook answers 200 for every accepted payload, including ones that
//! carry nothing actionable, so the platform does not redeliver them.

use crate::config::{Config, WhatsAppConfig};
use crate::conversation::ConversationStore;
use crate::llm::select_backend;
use crate::orchestrator::MessageOrchestrator;
use crate::secrets::SecretString;
use crate::whatsapp::types::WebhookPayload;
use crate::whatsapp::webhook::SIGNATURE_HEADER;
use crate::whatsapp::{
    group_by_sender, inbound_messages, verify_signature, verify_subscription, InboundMessage,
    OutboundChannel, WhatsAppClient,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sdk::errors::{EngineError, RelayErrorExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Notice sent when a reply could not be delivered
pub const DELIVERY_ERROR_NOTICE: &str = "Sorry, I encountered an error. Please try again later.";

const SERVICE_NAME: &str = "Relay WhatsApp AI Chatbot";

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<MessageOrchestrator>,
    pub outbound: Arc<dyn OutboundChannel>,
    pub verify_token: SecretString,
    pub app_secret: Option<SecretString>,
    pub debug: bool,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<MessageOrchestrator>,
        outbound: Arc<dyn OutboundChannel>,
        whatsapp: &WhatsAppConfig,
        debug: bool,
    ) -> Self {
        Self {
            orchestrator,
            outbound,
            verify_token: whatsapp.verify_token.clone().unwrap_or_default(),
            app_secret: whatsapp.app_secret.clone().filter(|s| !s.is_blank()),
            debug,
        }
    }
}

/// Query parameters of the subscription handshake
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the webhook server until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns `EngineError::Config` when WhatsApp settings or the provider
/// credential are missing, `EngineError::Network` when the address cannot be
/// bound, and `EngineError::Io` when the server fails while running.
pub async fn serve(config: &Config) -> Result<(), EngineError> {
    config.whatsapp.validate()?;

    let backend = select_backend(&config.llm)?;
    let store = Arc::new(ConversationStore::new(config.conversation.max_history));
    let orchestrator =
        Arc::new(MessageOrchestrator::new(backend, store).with_timeout(config.llm.timeout()));
    let outbound: Arc<dyn OutboundChannel> = Arc::new(WhatsAppClient::new(&config.whatsapp)?);

    let state = AppState::new(orchestrator, outbound, &config.whatsapp, config.core.debug);
    if state.app_secret.is_none() {
        tracing::warn!("WHATSAPP_APP_SECRET not set, webhook signatures will not be verified");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(
        addr = %addr,
        provider = %config.llm.provider,
        model = config.llm.active_model(),
        debug = config.core.debug,
        "Webhook server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to create SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM signal"),
    }
    tracing::info!("Shutting down gracefully");
}

async fn root_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "ai_provider": state.orchestrator.backend_name(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "ai_provider": state.orchestrator.backend_name(),
        "model": state.orchestrator.backend_model(),
        "debug": state.debug,
        "active_sessions": state.orchestrator.store().session_count(),
    }))
}

async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    tracing::info!(mode = ?params.mode, "Webhook verification request received");

    match verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        state.verify_token.unsecure(),
    ) {
        Some(challenge) => {
            tracing::info!("Webhook verified successfully");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            tracing::warn!("Webhook verification failed");
            (StatusCode::FORBIDDEN, "Verification failed").into_response()
        }
    }
}

async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.app_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if !verify_signature(&body, signature, secret.unsecure()) {
            tracing::warn!("Rejected webhook with missing or invalid signature");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "status": "unauthorized" })),
            )
                .into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Invalid webhook payload: {}", e);
            return Json(json!({ "status": "ignored" })).into_response();
        }
    };

    let messages = inbound_messages(&payload);
    tracing::info!(
        object = %payload.object,
        messages = messages.len(),
        "Webhook received"
    );

    // Senders run concurrently; one sender's messages run in delivery order
    let batches = group_by_sender(messages);
    futures::future::join_all(batches.iter().map(|batch| {
        let state = &state;
        async move {
            for message in batch {
                process_inbound(state, message).await;
            }
        }
    }))
    .await;

    Json(json!({ "status": "ok" })).into_response()
}

async fn process_inbound(state: &AppState, message: &InboundMessage) {
    if let Err(e) = state.outbound.mark_as_read(&message.message_id).await {
        tracing::warn!(message_id = %message.message_id, "Failed to mark message as read: {}", e);
    }

    let Some(reply) = state
        .orchestrator
        .handle(&message.sender, &message.text)
        .await
    else {
        return;
    };

    match state.outbound.send_text(&message.sender, reply.text()).await {
        Ok(()) => tracing::info!(sender = %message.sender, "Response sent"),
        Err(e) => {
            tracing::error!(
                sender = %message.sender,
                hint = e.user_hint(),
                "Failed to send reply: {}",
                e
            );
            if !e.is_recoverable() {
                return;
            }
            if let Err(e) = state
                .outbound
                .send_text(&message.sender, DELIVERY_ERROR_NOTICE)
                .await
            {
                tracing::warn!(sender = %message.sender, "Failed to send error notice: {}", e);
            }
        }
    }
}

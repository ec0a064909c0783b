//! Axum HTTP server for the OpenAI-compatible gateway.
//!
//! This module provides the router and the `serve()` function that runs it
//! on a pre-bound `TcpListener` until cancelled.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use oaibridge_core::{BridgeConfig, GenerationOutput, InferenceBackend};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::assemble::{CompletionIdentity, assemble_completion};
use crate::error::ApiError;
use crate::models::{BannerResponse, HealthResponse, ModelsResponse};
use crate::stream::{frames, sse_response};
use crate::transcode::{build_generation_request, parse_request};

/// Shared application state for the gateway.
#[derive(Clone)]
struct AppState {
    /// Inference backend requests are forwarded to.
    backend: Arc<dyn InferenceBackend>,
    /// Immutable startup configuration.
    config: Arc<BridgeConfig>,
}

/// Build the gateway router.
///
/// Exposed separately from [`serve`] so it can be driven in-process.
pub fn create_router(config: Arc<BridgeConfig>, backend: Arc<dyn InferenceBackend>) -> Router {
    let state = AppState { backend, config };

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway with a pre-bound listener.
///
/// This function runs the Axum server until the cancellation token is triggered.
///
/// # Arguments
///
/// * `listener` - Pre-bound TCP listener
/// * `config` - Gateway configuration (default model, backend URL, timeouts)
/// * `backend` - Inference backend requests are forwarded to
/// * `cancel` - Cancellation token for graceful shutdown
///
/// # Returns
///
/// Returns `Ok(())` on clean shutdown, or an error if the server fails.
pub async fn serve(
    listener: TcpListener,
    config: Arc<BridgeConfig>,
    backend: Arc<dyn InferenceBackend>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Gateway starting on {addr}");
    info!(
        backend = %config.backend_base(),
        default_model = %config.default_model,
        "Forwarding to backend"
    );

    let app = create_router(config, backend);

    info!("Gateway listening on {addr}");
    info!("Configure OpenAI clients to use: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Gateway shut down");
    Ok(())
}

/// Service banner.
async fn banner() -> impl IntoResponse {
    Json(BannerResponse {
        message: "OpenAI to Ollama Proxy".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check endpoint; probes the backend's version endpoint.
async fn health_check(State(state): State<AppState>) -> Response {
    let backend_url = state.backend.base_url().to_string();

    match state.backend.version().await {
        Ok(version) => {
            debug!(backend_version = %version, "Backend healthy");
            Json(HealthResponse {
                status: "healthy".to_string(),
                backend_reachable: true,
                backend_url,
                backend_version: Some(version),
            })
            .into_response()
        }
        Err(e) => {
            warn!("Backend health probe failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    backend_reachable: false,
                    backend_url,
                    backend_version: None,
                }),
            )
                .into_response()
        }
    }
}

/// List the backend's models in OpenAI format.
async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    debug!("GET /v1/models");

    let models = state.backend.list_models().await?;
    info!(count = models.len(), "Listing models");
    Ok(Json(ModelsResponse::from_backend(models)))
}

/// Handle chat completions: transcode, forward, and reshape the answer.
async fn chat_completions(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    debug!("POST /v1/chat/completions");

    let request = parse_request(&body)?;
    let message_count = request.messages.len();
    let generation = build_generation_request(request, &state.config.default_model)?;

    let identity = CompletionIdentity::new(generation.model.clone());
    info!(
        id = %identity.id,
        model = %generation.model,
        messages = message_count,
        prompt_chars = generation.prompt.len(),
        streaming = generation.stream,
        "Processing chat completion request"
    );

    let prompt = (!generation.stream).then(|| generation.prompt.clone());
    match state.backend.generate(generation).await? {
        GenerationOutput::Complete(completion) => {
            let response =
                assemble_completion(&identity, prompt.as_deref().unwrap_or_default(), completion);
            Ok(Json(response).into_response())
        }
        GenerationOutput::Stream(events) => Ok(sse_response(frames(events, identity))),
    }
}

/// Fallback for unknown routes.
async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

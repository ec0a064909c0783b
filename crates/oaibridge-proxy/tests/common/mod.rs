//! Shared helpers for gateway tests.
//!
//! `FakeBackend` is an in-memory `InferenceBackend` that records every
//! generation request it receives.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use oaibridge_core::{
    BackendError, BackendModel, BridgeConfig, Completion, EventStream, GenerationEvent,
    GenerationRequest, InferenceBackend,
};
use oaibridge_proxy::create_router;
use serde_json::Value;
use tower::ServiceExt;

pub const FAKE_BACKEND_URL: &str = "http://127.0.0.1:11434";

#[derive(Debug, Default)]
pub struct FakeBackend {
    pub models: Vec<BackendModel>,
    pub completion: Completion,
    pub events: Vec<Result<GenerationEvent, BackendError>>,
    /// Returned by every call when set.
    pub failure: Option<BackendError>,
    /// `None` makes the version probe fail.
    pub version: Option<String>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeBackend {
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: GenerationRequest) -> Result<(), BackendError> {
        self.requests.lock().unwrap().push(request);
        self.failure.clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    fn base_url(&self) -> &str {
        FAKE_BACKEND_URL
    }

    async fn list_models(&self) -> Result<Vec<BackendModel>, BackendError> {
        self.failure.clone().map_or_else(|| Ok(self.models.clone()), Err)
    }

    async fn complete(&self, request: GenerationRequest) -> Result<Completion, BackendError> {
        self.record(request)?;
        Ok(self.completion.clone())
    }

    async fn stream(&self, request: GenerationRequest) -> Result<EventStream, BackendError> {
        self.record(request)?;
        Ok(Box::pin(futures_util::stream::iter(self.events.clone())))
    }

    async fn version(&self) -> Result<String, BackendError> {
        self.version
            .clone()
            .ok_or_else(|| BackendError::Unreachable("connection refused".to_string()))
    }
}

pub fn config() -> Arc<BridgeConfig> {
    Arc::new(BridgeConfig::new(FAKE_BACKEND_URL, "llama2").unwrap())
}

pub fn router(backend: &Arc<FakeBackend>) -> Router {
    create_router(config(), backend.clone())
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// The `data:` payloads of an SSE body, in order.
pub fn sse_data(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data).to_string())
        .collect()
}

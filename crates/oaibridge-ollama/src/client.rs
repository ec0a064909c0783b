//! reqwest client for the Ollama HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use oaibridge_core::{
    BackendError, BackendModel, BridgeConfig, Completion, EventStream, GenerationRequest,
    InferenceBackend,
};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error, info};

use crate::ndjson::{decode_events, error_chain};
use crate::wire::{ErrorBody, GenerateChunk, TagsResponse, VersionResponse};

/// Maximum number of characters of an upstream error body kept in messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Ollama-backed implementation of [`InferenceBackend`].
///
/// Cloning is cheap: the underlying `reqwest::Client` shares its connection
/// pool between clones.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    config: BridgeConfig,
}

impl OllamaClient {
    /// Build a client for the backend described by `config`.
    ///
    /// The connect timeout is the request timeout, so an unreachable backend
    /// never blocks a call for longer than that.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn classify(&self, err: &reqwest::Error, timeout: Duration) -> BackendError {
        let detail = error_chain(err);
        if err.is_timeout() {
            BackendError::Timeout(timeout)
        } else if err.is_decode() {
            BackendError::InvalidResponse(detail)
        } else {
            debug!(base_url = %self.config.backend_base(), "Backend transport error: {detail}");
            BackendError::Unreachable(detail)
        }
    }

    /// Send a request and bound the wait for response headers.
    ///
    /// Used for streaming calls, where a whole-request timeout would cut
    /// long generations short.
    async fn send_with_header_timeout(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, BackendError> {
        match tokio::time::timeout(self.config.request_timeout, request.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(self.classify(&e, self.config.request_timeout)),
            Err(_) => Err(BackendError::Timeout(self.config.request_timeout)),
        }
    }
}

/// Turn a non-success response into a [`BackendError`].
///
/// `model` is the model the call was about; a 404 that mentions it becomes
/// `ModelNotFound`.
async fn check_status(response: Response, model: Option<&str>) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_else(|e| {
        debug!("Failed to read backend error body: {}", error_chain(&e));
        String::new()
    });
    let message = serde_json::from_str::<ErrorBody>(&raw)
        .map(|body| body.error)
        .unwrap_or_else(|_| raw.chars().take(MAX_ERROR_BODY_CHARS).collect());
    error!("Backend error {status}: {message}");

    if status == StatusCode::NOT_FOUND {
        if let Some(model) = model {
            if message.contains("not found") || message.is_empty() {
                return Err(BackendError::ModelNotFound(model.to_string()));
            }
        }
    }

    Err(BackendError::Status {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            message
        },
    })
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    fn base_url(&self) -> &str {
        self.config.backend_base()
    }

    async fn list_models(&self) -> Result<Vec<BackendModel>, BackendError> {
        let url = self.config.backend_endpoint("api/tags");
        debug!("GET {url}");

        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.classify(&e, self.config.request_timeout))?;
        let response = check_status(response, None).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| self.classify(&e, self.config.request_timeout))?;
        info!(count = tags.models.len(), "Listed backend models");
        Ok(tags.models)
    }

    async fn complete(&self, mut request: GenerationRequest) -> Result<Completion, BackendError> {
        request.stream = false;
        let url = self.config.backend_endpoint("api/generate");
        debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "POST {url} (non-streaming)"
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.classify(&e, self.config.request_timeout))?;
        let response = check_status(response, Some(&request.model)).await?;

        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| self.classify(&e, self.config.request_timeout))?;
        if let Some(message) = chunk.error {
            return Err(BackendError::InvalidResponse(message));
        }

        let completion = chunk.into_completion();
        info!(
            model = %request.model,
            response_chars = completion.text.len(),
            done_reason = ?completion.done_reason,
            "Backend completion received"
        );
        Ok(completion)
    }

    async fn stream(&self, mut request: GenerationRequest) -> Result<EventStream, BackendError> {
        request.stream = true;
        let url = self.config.backend_endpoint("api/generate");
        debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "POST {url} (streaming)"
        );

        let response = self
            .send_with_header_timeout(self.http.post(&url).json(&request))
            .await?;
        let response = check_status(response, Some(&request.model)).await?;

        info!(model = %request.model, "Backend stream opened");
        Ok(decode_events(response.bytes_stream(), self.config.request_timeout))
    }

    async fn version(&self) -> Result<String, BackendError> {
        let url = self.config.backend_endpoint("api/version");
        debug!("GET {url}");

        let response = self
            .http
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(|e| self.classify(&e, self.config.health_timeout))?;
        let response = check_status(response, None).await?;

        let body: VersionResponse = response
            .json()
            .await
            .map_err(|e| self.classify(&e, self.config.health_timeout))?;
        Ok(body.version)
    }
}

//! Inference backend port.
//!
//! This port defines the interface the gateway uses to reach the text
//! generation engine. It abstracts the HTTP details of the engine from the
//! request/response translation layer.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use thiserror::Error;

use crate::domain::{BackendModel, Completion, GenerationEvent, GenerationRequest};

/// Lazy, forward-only sequence of generation events.
///
/// Items arrive in backend order. A `StreamInterrupted` error is always the
/// last item. Dropping the stream releases the backend connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent, BackendError>> + Send>>;

/// Output of [`InferenceBackend::generate`], chosen by `GenerationRequest::stream`.
pub enum GenerationOutput {
    Complete(Completion),
    Stream(EventStream),
}

impl fmt::Debug for GenerationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(completion) => f.debug_tuple("Complete").field(completion).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Errors that can occur while talking to the inference backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure or similar transport problem.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// No response (or, when streaming, no next event) within the timeout.
    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success HTTP status.
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend does not know the requested model.
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// The event stream failed after it had started.
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// A success response whose body could not be decoded.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Returns a suggested HTTP status code for this error.
    #[must_use]
    pub const fn suggested_status_code(&self) -> u16 {
        match self {
            Self::ModelNotFound(_) => 404,
            Self::Timeout(_) => 504,
            Self::Status { status, .. } if *status >= 400 && *status <= 599 => *status,
            Self::Unreachable(_)
            | Self::Status { .. }
            | Self::StreamInterrupted(_)
            | Self::InvalidResponse(_) => 502,
        }
    }

    /// Stable machine-readable code used in OpenAI error envelopes.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "backend_unreachable",
            Self::Timeout(_) => "backend_timeout",
            Self::Status { .. } => "backend_error",
            Self::ModelNotFound(_) => "model_not_found",
            Self::StreamInterrupted(_) => "stream_interrupted",
            Self::InvalidResponse(_) => "invalid_backend_response",
        }
    }

    /// True for failures caused by the caller's request rather than the
    /// backend. A 4xx relayed from the backend still counts as a backend
    /// failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::ModelNotFound(_))
    }
}

/// Port for the text generation engine.
///
/// Implementations hold no per-request state; every call builds its own
/// HTTP request and owns its own connection.
#[async_trait]
pub trait InferenceBackend: Send + Sync + fmt::Debug {
    /// Base URL of the backend, for logging and health reports.
    fn base_url(&self) -> &str;

    /// List the models the backend can serve, in backend order.
    async fn list_models(&self) -> Result<Vec<BackendModel>, BackendError>;

    /// Run a generation to completion and return the whole text.
    ///
    /// The request's `stream` flag is ignored; the backend is always asked
    /// for a single response body.
    async fn complete(&self, request: GenerationRequest) -> Result<Completion, BackendError>;

    /// Start a generation and return its incremental events.
    ///
    /// The request's `stream` flag is ignored; the backend is always asked
    /// to stream.
    async fn stream(&self, request: GenerationRequest) -> Result<EventStream, BackendError>;

    /// Backend version string; used as a cheap reachability probe.
    async fn version(&self) -> Result<String, BackendError>;

    /// Run a generation in the mode selected by `request.stream`.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutput, BackendError> {
        if request.stream {
            self.stream(request).await.map(GenerationOutput::Stream)
        } else {
            self.complete(request).await.map(GenerationOutput::Complete)
        }
    }
}

//! OpenAI API data models for request/response handling.
//!
//! This module contains types that match the OpenAI chat completions API.
//! Domain types live in `oaibridge-core`; this module handles the API layer
//! mapping.

use oaibridge_core::{BackendError, BackendModel, ChatMessage, FinishReason, Role};
use serde::{Deserialize, Serialize};

// =============================================================================
// Chat Completion Request/Response Types
// =============================================================================

/// Request to /v1/chat/completions endpoint.
///
/// Only the supported parameter subset is modelled; any other field in the
/// body is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model name to use. Falls back to the configured default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Array of chat messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0-2).
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Top-p sampling parameter (0-1).
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response. `null` means no.
    #[serde(default)]
    pub stream: Option<bool>,
    /// Stop sequences.
    #[serde(default)]
    pub stop: Option<StopSequences>,
}

/// `stop` may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(stop) => vec![stop],
            Self::Many(stops) => stops,
        }
    }
}

/// Response from /v1/chat/completions endpoint (non-streaming).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

/// A single chat completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
}

/// Streaming chunk from /v1/chat/completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChunkChoice>,
}

/// A single streaming choice.
///
/// `finish_reason` is serialized as `null` until the terminal chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<FinishReason>,
}

/// Delta content in streaming response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

// =============================================================================
// Models Endpoint Types
// =============================================================================

/// Response from /v1/models endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelsResponse {
    /// Create a new `ModelsResponse` from the backend's model list, keeping
    /// its order.
    pub fn from_backend(models: Vec<BackendModel>) -> Self {
        Self {
            object: "list".to_string(),
            data: models.into_iter().map(ModelInfo::from).collect(),
        }
    }
}

/// Information about a single model (OpenAI format).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl From<BackendModel> for ModelInfo {
    fn from(model: BackendModel) -> Self {
        Self {
            created: model.created_unix(),
            id: model.name,
            object: "model".to_string(),
            owned_by: "ollama".to_string(),
        }
    }
}

// =============================================================================
// Service Endpoint Types
// =============================================================================

/// Response from `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerResponse {
    pub message: String,
    pub status: String,
    pub version: String,
}

/// Response from `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"healthy"` or `"degraded"`.
    pub status: String,
    pub backend_reachable: bool,
    pub backend_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,
}

// =============================================================================
// Error Response Types
// =============================================================================

/// Error response matching OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create an error response with a code.
    pub fn with_code(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: Some(code.into()),
            },
        }
    }

    /// Create an error response for a request the gateway rejected.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_code(message, "invalid_request_error", "invalid_request")
    }

    /// Create an error response for an unknown route.
    pub fn not_found(path: &str) -> Self {
        Self::with_code(
            format!("Unknown route: {path}"),
            "invalid_request_error",
            "not_found",
        )
    }
}

impl From<&BackendError> for ErrorResponse {
    fn from(err: &BackendError) -> Self {
        let error_type = if err.is_client_error() {
            "invalid_request_error"
        } else {
            "server_error"
        };
        Self::with_code(err.to_string(), error_type, err.error_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_accepts_minimal_body() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "Hello!"}]
        }))
        .unwrap();
        assert!(request.model.is_none());
        assert!(request.stream.is_none());
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_request_ignores_unknown_fields() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "llama2",
            "messages": [{"role": "user", "content": "Hi"}],
            "presence_penalty": 0.5,
            "user": "abc",
            "stream": null
        }))
        .unwrap();
        assert_eq!(request.model.as_deref(), Some("llama2"));
        assert_eq!(request.stream, None);
    }

    #[test]
    fn test_stop_forms() {
        let one: StopSequences = serde_json::from_value(json!("\n")).unwrap();
        assert_eq!(one.into_vec(), vec!["\n".to_string()]);
        let many: StopSequences = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(many.into_vec(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_request_rejects_unknown_role() {
        let result = serde_json::from_value::<ChatCompletionRequest>(json!({
            "messages": [{"role": "tool", "content": "x"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_serializes_null_finish_reason() {
        let choice = ChatChunkChoice {
            index: 0,
            delta: ChatDelta {
                role: None,
                content: Some("Hi".to_string()),
            },
            finish_reason: None,
        };
        assert_eq!(
            serde_json::to_value(&choice).unwrap(),
            json!({"index": 0, "delta": {"content": "Hi"}, "finish_reason": null})
        );
    }

    #[test]
    fn test_model_info_from_backend() {
        let info = ModelInfo::from(BackendModel {
            modified_at: Some("2024-05-01T10:00:00Z".to_string()),
            ..BackendModel::named("llama2:latest")
        });
        assert_eq!(info.id, "llama2:latest");
        assert_eq!(info.object, "model");
        assert_eq!(info.owned_by, "ollama");
        assert_eq!(info.created, 1_714_557_600);
    }

    #[test]
    fn test_backend_error_envelope() {
        let body = serde_json::to_value(ErrorResponse::from(&BackendError::ModelNotFound(
            "nope".to_string(),
        )))
        .unwrap();
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["code"], "model_not_found");
        assert_eq!(body["error"]["message"], "Model 'nope' not found");

        let body = serde_json::to_value(ErrorResponse::from(&BackendError::Status {
            status: 500,
            message: "boom".to_string(),
        }))
        .unwrap();
        assert_eq!(body["error"]["type"], "server_error");
        assert_eq!(body["error"]["code"], "backend_error");
    }
}

//! Ollama API wire types.
//!
//! Only the fields the bridge reads are modelled; everything else in the
//! backend's JSON (e.g. `context`, `details`) is ignored.

use oaibridge_core::{BackendModel, Completion, GenerationEvent, GenerationMetadata};
use serde::Deserialize;

/// Response from `GET /api/tags`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<BackendModel>,
}

/// Response from `GET /api/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Error body returned by Ollama on failure: `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of a non-streaming `/api/generate` response, and of every line of a
/// streaming one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Set instead of the other fields when the backend fails mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerateChunk {
    fn metadata(&self) -> GenerationMetadata {
        GenerationMetadata {
            model: self.model.clone(),
            created_at: self.created_at.clone(),
            done_reason: self.done_reason.clone(),
            total_duration: self.total_duration,
            prompt_eval_count: self.prompt_eval_count,
            eval_count: self.eval_count,
        }
    }

    /// Convert one streamed line into a generation event.
    ///
    /// Only the terminal line carries metadata.
    pub fn into_event(self) -> GenerationEvent {
        if self.done {
            let metadata = self.metadata();
            GenerationEvent {
                text_delta: self.response,
                done: true,
                metadata: Some(metadata),
            }
        } else {
            GenerationEvent::delta(self.response)
        }
    }

    /// Convert a whole non-streaming response into a completion.
    pub fn into_completion(self) -> Completion {
        Completion {
            model: self.model,
            text: self.response,
            done_reason: self.done_reason,
            prompt_eval_count: self.prompt_eval_count,
            eval_count: self.eval_count,
            total_duration: self.total_duration,
        }
    }
}

//! Generation request and output types on the backend side of the bridge.
//!
//! `GenerationRequest` serializes directly into the body accepted by the
//! backend's generate endpoint: absent options are omitted, never defaulted.

use serde::{Deserialize, Serialize};

/// Sampling and length options forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl GenerationOptions {
    /// True when no option is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.num_predict.is_none()
            && self.stop.is_none()
    }
}

/// A single prompt-based generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options: GenerationOptions::default(),
        }
    }

    #[must_use]
    pub const fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Why generation stopped, in OpenAI terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    #[default]
    Stop,
    /// The token limit (`num_predict`) was reached.
    Length,
}

impl FinishReason {
    /// Map the backend's `done_reason` onto an OpenAI finish reason.
    ///
    /// Only `"length"` is distinguished; every other reason (including a
    /// missing one) means the model stopped on its own.
    #[must_use]
    pub fn from_done_reason(done_reason: Option<&str>) -> Self {
        match done_reason {
            Some("length") => Self::Length,
            _ => Self::Stop,
        }
    }
}

/// Statistics the backend attaches to the final event of a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model: String,
    pub created_at: Option<String>,
    pub done_reason: Option<String>,
    /// Wall-clock generation time in nanoseconds.
    pub total_duration: Option<u64>,
    pub prompt_eval_count: Option<u32>,
    pub eval_count: Option<u32>,
}

/// One unit of incremental backend output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationEvent {
    pub text_delta: String,
    pub done: bool,
    pub metadata: Option<GenerationMetadata>,
}

impl GenerationEvent {
    /// A non-terminal event carrying a text fragment.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text_delta: text.into(),
            done: false,
            metadata: None,
        }
    }

    /// The terminal event of a stream.
    #[must_use]
    pub const fn finished(metadata: Option<GenerationMetadata>) -> Self {
        Self {
            text_delta: String::new(),
            done: true,
            metadata,
        }
    }

    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        FinishReason::from_done_reason(
            self.metadata
                .as_ref()
                .and_then(|meta| meta.done_reason.as_deref()),
        )
    }
}

/// Full output of a non-streaming generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub model: String,
    pub text: String,
    pub done_reason: Option<String>,
    pub prompt_eval_count: Option<u32>,
    pub eval_count: Option<u32>,
    pub total_duration: Option<u64>,
}

impl Completion {
    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        FinishReason::from_done_reason(self.done_reason.as_deref())
    }
}

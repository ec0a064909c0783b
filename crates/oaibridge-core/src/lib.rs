#![doc = include_str!("../README.md")]

pub mod config;
pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{
    BridgeConfig, ConfigError, DEFAULT_BACKEND_URL, DEFAULT_HEALTH_TIMEOUT_SECS, DEFAULT_HOST,
    DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use domain::{
    BackendModel, ChatMessage, Completion, ContentPart, FinishReason, GenerationEvent,
    GenerationMetadata, GenerationOptions, GenerationRequest, MessageContent, Role,
    ValidationError,
};
pub use ports::{BackendError, EventStream, GenerationOutput, InferenceBackend};

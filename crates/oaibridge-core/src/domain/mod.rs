//! Domain types shared by the gateway and backend adapters.

mod chat;
mod generation;
mod model;

pub use chat::{ChatMessage, ContentPart, MessageContent, Role, ValidationError};
pub use generation::{
    Completion, FinishReason, GenerationEvent, GenerationMetadata, GenerationOptions,
    GenerationRequest,
};
pub use model::BackendModel;

//! Port definitions (trait abstractions) for infrastructure concerns.
//!
//! The gateway only talks to the inference engine through these traits,
//! so the HTTP adapter in `oaibridge-ollama` can be swapped for a fake in
//! tests.

mod backend;

pub use backend::{BackendError, EventStream, GenerationOutput, InferenceBackend};

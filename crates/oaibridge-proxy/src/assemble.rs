//! Backend output → OpenAI completion objects.

use chrono::Utc;
use oaibridge_core::{ChatMessage, Completion, FinishReason, GenerationEvent, Role};
use uuid::Uuid;

use crate::models::{
    ChatChoice, ChatChunkChoice, ChatCompletionChunk, ChatCompletionResponse, ChatDelta, Usage,
};

const COMPLETION_OBJECT: &str = "chat.completion";
const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Identity shared by every object produced for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionIdentity {
    /// `chatcmpl-<uuid>`, unique per call.
    pub id: String,
    /// Unix seconds at the start of the call.
    pub created: i64,
    pub model: String,
}

impl CompletionIdentity {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            created: Utc::now().timestamp(),
            model: model.into(),
        }
    }
}

/// Rough token count used when the backend reports none: one token per
/// four characters.
pub fn estimate_tokens(text: &str) -> u32 {
    u32::try_from(text.chars().count() / 4).unwrap_or(u32::MAX)
}

/// Build the single response object of a non-streaming call.
///
/// `prompt` is the flattened prompt sent to the backend; it is only read to
/// estimate usage when the backend omits its token counts.
pub fn assemble_completion(
    identity: &CompletionIdentity,
    prompt: &str,
    completion: Completion,
) -> ChatCompletionResponse {
    let usage = Usage::new(
        completion
            .prompt_eval_count
            .unwrap_or_else(|| estimate_tokens(prompt)),
        completion
            .eval_count
            .unwrap_or_else(|| estimate_tokens(&completion.text)),
    );
    let finish_reason = completion.finish_reason();

    ChatCompletionResponse {
        id: identity.id.clone(),
        object: COMPLETION_OBJECT.to_string(),
        created: identity.created,
        model: identity.model.clone(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage::assistant(completion.text),
            finish_reason,
        }],
        usage,
    }
}

/// Turns generation events into streaming chunks, one call at a time.
///
/// The first chunk carries `delta.role`; the terminal chunk carries an empty
/// delta (or only the role, if nothing came before it) and the finish
/// reason. Nothing is emitted after the terminal chunk.
#[derive(Debug)]
pub struct ChunkAssembler {
    identity: CompletionIdentity,
    role_sent: bool,
    finished: bool,
}

impl ChunkAssembler {
    pub const fn new(identity: CompletionIdentity) -> Self {
        Self {
            identity,
            role_sent: false,
            finished: false,
        }
    }

    pub const fn identity(&self) -> &CompletionIdentity {
        &self.identity
    }

    /// True once the terminal chunk has been produced.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Chunks for one event, in emission order.
    ///
    /// A non-terminal event yields one content chunk. The terminal event
    /// yields the terminal chunk, preceded by a content chunk when it still
    /// carries text.
    pub fn push(&mut self, event: GenerationEvent) -> Vec<ChatCompletionChunk> {
        if self.finished {
            return Vec::new();
        }

        let finish_reason = event.finish_reason();
        if !event.done {
            return vec![self.content(event.text_delta)];
        }

        let mut chunks = Vec::with_capacity(2);
        if !event.text_delta.is_empty() {
            chunks.push(self.content(event.text_delta));
        }
        chunks.push(self.terminal(finish_reason));
        chunks
    }

    /// Terminal chunk for a stream that ended without a `done` event.
    pub fn finish(&mut self) -> Option<ChatCompletionChunk> {
        (!self.finished).then(|| self.terminal(FinishReason::Stop))
    }

    fn content(&mut self, text: String) -> ChatCompletionChunk {
        let role = self.take_role();
        self.chunk(
            ChatDelta {
                role,
                content: Some(text),
            },
            None,
        )
    }

    fn terminal(&mut self, finish_reason: FinishReason) -> ChatCompletionChunk {
        self.finished = true;
        let role = self.take_role();
        self.chunk(ChatDelta { role, content: None }, Some(finish_reason))
    }

    fn take_role(&mut self) -> Option<Role> {
        let role = (!self.role_sent).then_some(Role::Assistant);
        self.role_sent = true;
        role
    }

    fn chunk(&self, delta: ChatDelta, finish_reason: Option<FinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.identity.id.clone(),
            object: CHUNK_OBJECT.to_string(),
            created: self.identity.created,
            model: self.identity.model.clone(),
            choices: vec![ChatChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

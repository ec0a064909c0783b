//! Chat conversation types as received from OpenAI-style clients.
//!
//! The role set is closed: anything other than `system`, `user` or
//! `assistant` is rejected at deserialization time.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Label used when the role is rendered into a flat prompt (`"User"`, ...).
    #[must_use]
    pub const fn prompt_label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One element of array-form message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part type; only `"text"` contributes to the prompt.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Message content: either a plain string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Plain text of this content.
    ///
    /// Text parts are joined with a newline; parts of any other type
    /// (images, audio) are dropped.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Parts(parts) => Cow::Owned(
                parts
                    .iter()
                    .filter(|part| part.kind == "text")
                    .filter_map(|part| part.text.as_deref())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A single role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Plain text of the message content.
    pub fn text(&self) -> Cow<'_, str> {
        self.content.as_text()
    }
}

/// Inbound request could not be turned into a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The body was not valid JSON or did not match the request shape.
    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    /// `messages` was present but empty.
    #[error("'messages' must contain at least one message")]
    EmptyConversation,

    /// A parameter was present but outside its accepted range.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

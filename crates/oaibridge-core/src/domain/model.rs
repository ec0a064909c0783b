//! Models reported by the inference backend.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// A model as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendModel {
    /// Model name including tag (e.g. `llama2:latest`).
    pub name: String,
    /// RFC 3339 timestamp of the last modification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    /// Size on disk in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl BackendModel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified_at: None,
            size: None,
            digest: None,
        }
    }

    /// `modified_at` as unix seconds, or 0 when absent or unparseable.
    ///
    /// Derived from backend data only, so an unchanged backend always
    /// reports the same value.
    #[must_use]
    pub fn created_unix(&self) -> i64 {
        self.modified_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map_or(0, |ts| ts.timestamp())
    }
}

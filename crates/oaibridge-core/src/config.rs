//! Process-wide bridge configuration.
//!
//! `BridgeConfig` is built once at startup (the CLI layer reads flags and
//! environment variables into it) and then passed by value or `Arc` into the
//! gateway and the backend client. Nothing reads the environment after that.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default base URL of the Ollama backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";

/// Default bind host for the gateway.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port for the gateway.
pub const DEFAULT_PORT: u16 = 8889;

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "llama2";

/// Default per-call backend timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Timeout for the health probe in seconds.
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Errors produced while building or validating a [`BridgeConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL '{url}': {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("Backend URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("Default model name must not be empty")]
    EmptyDefaultModel,

    #[error("Bind host must not be empty")]
    EmptyHost,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Immutable configuration shared by the gateway and the backend client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL of the inference backend.
    pub backend_url: Url,
    /// Host the gateway binds to.
    pub host: String,
    /// Port the gateway binds to.
    pub port: u16,
    /// Model used when the request omits `model`.
    pub default_model: String,
    /// Bounds a whole non-streaming call, and the gap between two
    /// consecutive reads of a streaming call.
    pub request_timeout: Duration,
    /// Bounds the health probe.
    pub health_timeout: Duration,
}

impl BridgeConfig {
    /// Create a config pointing at `backend_url` with default everything else.
    pub fn new(backend_url: &str, default_model: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            backend_url: parse_backend_url(backend_url)?,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_model: default_model.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with default values.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(DEFAULT_BACKEND_URL, DEFAULT_MODEL)
    }

    /// Set the bind address.
    #[must_use]
    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the per-call backend timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the health probe timeout.
    #[must_use]
    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Check invariants that the builder methods cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend_url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultModel);
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("Request timeout"));
        }
        if self.health_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("Health timeout"));
        }
        Ok(())
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Backend base URL without a trailing slash.
    #[must_use]
    pub fn backend_base(&self) -> &str {
        self.backend_url.as_str().trim_end_matches('/')
    }

    /// Absolute URL of a backend endpoint, e.g. `endpoint("/api/tags")`.
    #[must_use]
    pub fn backend_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_base(), path.trim_start_matches('/'))
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBackendUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

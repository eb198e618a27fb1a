//! Error taxonomy for the harness-mem client.
//!
//! # Design
//! Three kinds of failure reach the caller, each as its own variant so that
//! recovery can be chosen per kind:
//! - `Transport`: the round-trip failed or the reply was not a JSON object.
//!   There is no status code to report.
//! - `Api`: the service rejected the call, through a non-2xx status or an
//!   explicit `ok: false` envelope (reported as status 200).
//! - `Validation`: a local precondition failed before anything was sent.
//!
//! The client never retries and never swallows any of them.

use serde_json::Value;
use thiserror::Error;

/// Result type alias using the client's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `HarnessMemClient` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Connectivity, timeout, or unparsable response.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The service reported failure.
    #[error("API error (status={status_code}): {message}")]
    Api {
        status_code: u16,
        message: String,
        body: Option<Value>,
    },

    /// Caller input failed a local check; no request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// A request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn api(status_code: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
            body,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }

    /// Status code of an `Api` error; `None` for every other kind.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Transport { message } | Self::Api { message, .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            Self::Serialization(e) => e.to_string(),
        }
    }
}

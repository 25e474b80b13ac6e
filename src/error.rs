//! Error types shared across subsystems.
//!
//! Configuration errors live in `config::loader`; the types here cover rule
//! compilation and the per-delivery failures of the dispatcher.

use thiserror::Error;

/// A when clause failed to compile. Fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule '{rule}': invalid when clause at offset {offset}: {reason}")]
pub struct CompileError {
    pub rule: String,
    pub offset: usize,
    pub reason: String,
}

/// A template could not produce a JSON body. Aborts one delivery.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template '{0}' is not registered")]
    UnknownTemplate(String),

    #[error("template '{name}' failed to render: {source}")]
    Render {
        name: String,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("template '{name}' produced invalid JSON: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A delivery attempt could not obtain a response status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

use std::path::PathBuf;

use crate::drafts::DraftId;

/// Failure of a writing check round trip. Recoverable: the caller keeps
/// its current suggestions and may retry.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("No check service configured")]
    NotConfigured,

    #[error("Request to check service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Check service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed check response: {0}")]
    Malformed(String),

    #[error("Check worker went away before answering")]
    Disconnected,

    #[error("No check result within {0:?}")]
    Timeout(std::time::Duration),
}

impl From<serde_json::Error> for OracleError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Draft {0} not found")]
    NotFound(DraftId),

    #[error("Draft storage error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Error types for the Crewdeck sync core.
//!
//! Every failure in this layer degrades to "keep showing last-known-good
//! cached data" — errors are reported to the caller, never escalated to a
//! panic. Parse problems and resolution misses are recovered inside the
//! normalizer/resolver and never surface here.

use thiserror::Error;

/// Result type alias for Crewdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the sync core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cache database error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("Remote request failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("Remote returned {status} for {table}: {body}")]
    RemoteRejected {
        table: String,
        status: u16,
        body: String,
    },

    #[error("Entity not found in cache: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error indicates a connectivity problem (as opposed to a
    /// rejected write or a local fault). Connectivity failures update the
    /// sync status surface; the cached data stays visible.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::RemoteRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_write_is_not_connectivity() {
        let err = Error::RemoteRejected {
            table: "Deliverables".to_string(),
            status: 422,
            body: "bad field".to_string(),
        };
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_server_error_is_connectivity() {
        let err = Error::RemoteRejected {
            table: "Staff".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(err.is_connectivity());
    }
}

//! Error types for the asset-sync library.

use thiserror::Error;

use crate::lifecycle::WorkerState;

/// Errors that can occur while synchronizing or serving cached assets.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during store operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A fetch failed before any response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// A batch fetch received a response without a success status.
    #[error("Request for {url} failed with status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code of the response.
        status: u16,
    },

    /// Manifest or shell list is malformed.
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// A cache entry on disk could not be decoded.
    #[error("Corrupt cache entry: {0}")]
    Store(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration values that parse but cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A lifecycle operation was requested in a state that does not allow it.
    #[error("Cannot {operation} while worker is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the worker was in.
        state: WorkerState,
    },
}

impl Error {
    /// Returns true if the error came from the network boundary rather
    /// than from local storage.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Network(_) | Self::Status { .. })
    }
}

/// A specialized `Result` type for asset-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_classified() {
        assert!(Error::Network("offline".into()).is_network());
        assert!(
            Error::Status {
                url: "https://app.test/a.js".into(),
                status: 404,
            }
            .is_network()
        );
        assert!(!Error::Store("bad".into()).is_network());
    }

    #[test]
    fn invalid_config_is_not_network() {
        let err = Error::InvalidConfig("cache name is empty".into());
        assert!(!err.is_network());
        assert_eq!(err.to_string(), "Invalid configuration: cache name is empty");
    }

    #[test]
    fn invalid_state_message_names_operation() {
        let err = Error::InvalidState {
            operation: "activate",
            state: WorkerState::Uninstalled,
        };
        assert_eq!(err.to_string(), "Cannot activate while worker is uninstalled");
    }
}

//! Error types for the stockwatch system
//!
//! None of these errors is fatal to a run: the controller logs them and
//! carries on, so the next scheduled invocation always gets its chance.

use thiserror::Error;

/// Result type alias for stockwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the stockwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// Fetching or reading an order page failed
    #[error("Probe error: {0}")]
    Probe(String),

    /// A notification channel could not deliver a message
    #[error("Notify error ({channel}): {message}")]
    Notify {
        /// Channel name
        channel: String,
        /// Error message
        message: String,
    },

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a channel-specific notify error
    pub fn notify(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notify {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

//! Error types for the call control core
//!
//! Filtering and route decisions never fail: late reports, missing reports
//! and impossible route requests are all absorbed into well-defined
//! outcomes. The errors here only come from the edges of the crate -
//! loading configuration, installing logging, and talking to a state
//! machine whose event loop has already gone away.

use thiserror::Error;

/// Result type for call control operations
pub type CallControlResult<T> = Result<T, CallControlError>;

/// Errors that can occur at the boundary of the call control core
#[derive(Debug, Error)]
pub enum CallControlError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration document could not be parsed
    #[error("Invalid configuration document: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The audio route state machine's event loop is no longer running
    #[error("Audio route state machine '{name}' has stopped")]
    StateMachineStopped { name: String },

    /// An event loop was started outside a Tokio runtime
    #[error("No Tokio runtime available: {message}")]
    NoRuntime { message: String },

    /// Logging could not be initialised
    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

impl CallControlError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a stopped state machine error
    pub fn stopped(name: impl Into<String>) -> Self {
        Self::StateMachineStopped { name: name.into() }
    }

    /// Create a logging error
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

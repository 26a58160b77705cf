//! Error types for language-model calls.

use thiserror::Error;

/// Errors that can occur while requesting a completion.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be built or sent.
    #[error("Request to {model} failed: {message}")]
    Request {
        /// The model the request targeted.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider answered with an error.
    #[error("{model} returned an error: {message}")]
    Api {
        /// The model the request targeted.
        model: String,
        /// The provider's error message.
        message: String,
    },

    /// The provider answered without any completion text.
    #[error("{model} returned no completion")]
    EmptyResponse {
        /// The model the request targeted.
        model: String,
    },

    /// Invalid client configuration.
    #[error("Invalid model configuration: {0}")]
    Config(String),
}

/// Result type alias for [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

//! Error types

use thiserror::Error;

/// Errors surfaced while issuing a request.
///
/// Parsing never fails: a response that cannot be fully understood degrades
/// to partial structured data instead of producing an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport produced no usable result. Carries the engine's
    /// machine-readable error code and its human-readable description.
    #[error("transport error ({code}): {message}")]
    Transport {
        /// CURLcode reported by the engine.
        code: u32,
        /// Engine description of the failure.
        message: String,
    },
    /// Request parameters could not be url-encoded.
    #[error("could not encode request parameters: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
    /// A multipart form could not be assembled.
    #[error("could not assemble multipart form: {0}")]
    Form(#[from] curl::FormError),
}

impl From<curl::Error> for Error {
    fn from(err: curl::Error) -> Self {
        Error::Transport {
            code: err.code() as u32,
            message: err.description().to_string(),
        }
    }
}

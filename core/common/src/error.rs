//! Common error types for Boxbridge.

use thiserror::Error;

/// Top-level error type for provider operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation needing an access token was called without one.
    #[error("Missing access token. Authorize first.")]
    AuthRequired,

    /// The token endpoint rejected the authorization code.
    #[error("Token request failed: {status}")]
    Auth { status: u16 },

    /// The content-upload endpoint answered with a non-200 status.
    #[error("Upload failed: {status} {body}")]
    Upload { status: u16, body: String },

    /// The listing endpoint answered with a non-200 status.
    #[error("List failed: {status} {body}")]
    List { status: u16, body: String },

    /// Pagination ran past the configured page bound.
    #[error("List failed: more than {0} pages returned")]
    PageLimitExceeded(usize),

    /// Transport-level failure talking to the provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status reported by the provider, when the error carries one.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Error::Auth { status }
            | Error::Upload { status, .. }
            | Error::List { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

//! Email loading and extraction error types.

use thiserror::Error;

use crate::error::StorageError;

/// Faults that make a whole email unprocessable.
#[derive(Error, Debug)]
pub enum EmailError {
    /// The raw object could not be read.
    #[error("Failed to load raw email: {0}")]
    Storage(#[from] StorageError),

    /// The stored object has no content.
    #[error("Raw email '{key}' is empty")]
    Empty { key: String },

    /// The content is not a MIME message.
    #[error("Failed to parse email: {0}")]
    ParseError(String),

    /// A header needed for attachment metadata is absent.
    #[error("Email has no usable '{0}' header")]
    MissingHeader(&'static str),

    /// The Date header does not map to a valid instant.
    #[error("Email date is out of range: {0}")]
    InvalidDate(String),
}

/// Result type for email operations.
pub type Result<T> = std::result::Result<T, EmailError>;

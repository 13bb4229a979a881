//! Error types for descriptor construction and typed decoding.
//!
//! # Design
//! The controller itself never returns these: every network result is an
//! `Outcome`. `ApiError` covers the caller-side steps around it, building a
//! descriptor from user input and turning an `Outcome` into a DTO.
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from other failures.

use thiserror::Error;

use crate::outcome::FailureReason;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 404.
    #[error("resource not found: {message}")]
    NotFound { message: String },

    /// The call settled as a failure other than a 404.
    #[error("request failed ({reason}): {message}")]
    RequestFailed {
        reason: FailureReason,
        status: Option<u16>,
        message: String,
    },

    /// The success body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Caller input was rejected before any request was built.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("unsupported file type '{0}': expected .json or .jsonl")]
    UnsupportedFileType(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

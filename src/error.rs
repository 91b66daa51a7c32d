//! Centralized error types for throw.

use std::path::PathBuf;
use thiserror::Error;

use crate::gallery::GalleryError;
use crate::transport::TransportError;

/// All errors produced by the throw library.
#[derive(Error, Debug)]
pub enum ThrowError {
    /// No recipient was given for the files.
    #[error("No recipients given: at least one e-mail address is required")]
    NoRecipients,

    /// Path expansion produced no regular files.
    #[error("No files to send: none of the given paths is a readable file")]
    NoFiles,

    /// The gallery could not be created, so nothing could be uploaded.
    #[error("Gallery upload failed: {0}")]
    UploadFailure(#[source] GalleryError),

    /// The mail transport refused or failed to deliver the message.
    #[error("Mail transport failed: {0}")]
    Transport(#[source] TransportError),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An e-mail address could not be parsed.
    #[error("Invalid e-mail address: {0}")]
    InvalidAddress(String),

    /// The message could not be assembled into RFC 5322 form.
    #[error("Could not build message: {0}")]
    MessageBuild(String),

    /// A required configuration option has no stored value and no default.
    #[error("Missing configuration option '{section}.{option}'")]
    MissingConfig { section: String, option: String },

    /// The configuration file exists but cannot be used.
    #[error("Invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// Reading an answer from the user failed.
    #[error("Interaction error: {0}")]
    Interaction(String),

    /// The user cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,
}

/// Convenience alias for `Result<T, ThrowError>`.
pub type Result<T> = std::result::Result<T, ThrowError>;

impl ThrowError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `MissingConfig` variant.
    pub fn missing(section: &str, option: &str) -> Self {
        Self::MissingConfig {
            section: section.to_string(),
            option: option.to_string(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `ThrowError::io`).
impl From<std::io::Error> for ThrowError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

impl From<TransportError> for ThrowError {
    fn from(source: TransportError) -> Self {
        Self::Transport(source)
    }
}

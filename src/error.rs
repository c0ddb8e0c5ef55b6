// src/error.rs

//! Error types shared across the recipe engine

use crate::verify::VerifyError;
use thiserror::Error;

/// Errors produced by recipe parsing, concretization, and cooking
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem or process I/O failure
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed recipe, predicate, or checksum string
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A file, patch, or version that should exist does not
    #[error("Not found: {0}")]
    NotFound(String),

    /// Source or patch download failure
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Downloaded or cached content does not match its declared checksum
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Build request cannot be satisfied by the recipe
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// A build phase exited unsuccessfully
    #[error("{phase} phase failed: {message}")]
    BuildFailed { phase: String, message: String },

    /// Post-install verification failed
    #[error("Verification failed: {0}")]
    Verification(#[from] VerifyError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

//! Error type shared by every layer of the index.
//!
//! Lower layers report precise kinds; `Index` and `SuggestionProcessor`
//! mostly pass them through unchanged.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input from the caller. Never retried internally.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required dependency was missing at construction time.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Term, value index or schema type is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Hit buffer or lexicon is full, or a heap ran dry.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Error::ResourceExhausted(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

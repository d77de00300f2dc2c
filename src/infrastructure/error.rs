//! Infrastructure-level errors (wraps application errors) and store errors

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::CategoryId;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {message}")]
    Serialize { message: String },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;

/// Failures of a [`CategoryStore`](crate::infrastructure::store::CategoryStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("category not found: {0}")]
    NotFound(CategoryId),

    #[error("store I/O failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse catalog {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("cannot serialize catalog: {0}")]
    Serialize(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

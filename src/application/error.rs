//! Application-level errors (wraps domain and store errors)

use thiserror::Error;

use crate::domain::{CategoryId, DomainError};
use crate::infrastructure::StoreError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("category not found: {0}")]
    NotFound(CategoryId),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// True for write-boundary rejections (the request itself was invalid).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, ApplicationError::Domain(_))
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

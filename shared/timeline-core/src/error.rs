//! Error types for timeline readers

use thiserror::Error;
use timeline_store::StoreError;

pub type Result<T> = std::result::Result<T, TimelineError>;

#[derive(Error, Debug)]
pub enum TimelineError {
    /// The request is unusable; raised before the store is touched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stored row does not match the table's key layout.
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TimelineError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MalformedRow(_) => "MALFORMED_ROW",
            Self::Store(_) => "STORE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Only transport failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transport(),
            _ => false,
        }
    }
}

//! Store Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Transport failures are worth retrying; schema and decode failures are not.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

//! Error types for tasq-rs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Dequeue found no entries. An expected outcome, not a failure.
    #[error("queue is empty: {0}")]
    EmptyQueue(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("malformed store result: {0}")]
    MalformedStoreResult(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the empty-queue signal, false for every real failure.
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, Error::EmptyQueue(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. } => Error::MalformedStoreResult(e.to_string()),
            other => Error::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        // Server ERR replies count as the store failing, not as bad data
        match e.kind() {
            redis::ErrorKind::TypeError => Error::MalformedStoreResult(e.to_string()),
            _ => Error::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Other(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

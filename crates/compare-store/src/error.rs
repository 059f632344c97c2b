//! Error types for store access.

use thiserror::Error;

/// Errors raised by a [`crate::KeyValueStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The endpoint could not be reached or refused the handshake.
    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: redis::RedisError,
    },

    /// A command or pipeline failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The connection options are unusable.
    #[error("Invalid connection options: {0}")]
    InvalidOptions(String),

    /// The command is not valid for the stored value type.
    #[error("WRONGTYPE operation {command} on key {key}")]
    WrongType { command: String, key: String },

    /// Failure injected into an in-memory store.
    #[error("Injected failure for {0}")]
    Injected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

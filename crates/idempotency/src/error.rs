use common::{ContextError, IdempotencyKey};
use thiserror::Error;

/// Errors that can occur when interacting with the idempotency store.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// Another attempt currently owns the key.
    #[error("Idempotency key is already being processed: {key}")]
    InFlight { key: IdempotencyKey },

    /// The caller's context was cancelled or its deadline passed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A Redis error occurred.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for idempotency store operations.
pub type Result<T> = std::result::Result<T, IdempotencyError>;

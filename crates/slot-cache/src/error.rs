use thiserror::Error;

/// Errors raised by slot cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A Redis command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A cached value could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

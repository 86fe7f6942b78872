use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("cache record {0} not found")]
    RecordNotFound(String),

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache operation timed out after {0}ms")]
    Timeout(u64),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

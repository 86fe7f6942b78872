use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row {0} not found")]
    RowNotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store operation timed out after {0}ms")]
    Timeout(u64),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

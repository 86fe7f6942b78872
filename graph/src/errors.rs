use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph backend error: {0}")]
    Backend(String),

    #[error("graph operation timed out after {0}ms")]
    Timeout(u64),

    #[error("node payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

use householdiq_graph::GraphError;
use householdiq_kvcache::CacheError;
use householdiq_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgingError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("bridging token error: {0}")]
    Token(String),
}

pub type BridgingResult<T> = std::result::Result<T, BridgingError>;

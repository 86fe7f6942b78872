use householdiq_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid partner_id")]
    InvalidPartner,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status an outer binding should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidPartner => 400,
            ApiError::Validation(_) => 422,
            ApiError::Store(_) | ApiError::Internal(_) => 500,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

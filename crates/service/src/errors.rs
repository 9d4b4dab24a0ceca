use models::errors::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ServiceError {
    pub fn not_found(id: &str) -> Self { Self::NotFound(format!("object {id} not found")) }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => Self::Validation(msg),
            ModelError::Serialization(msg) => Self::Serialization(msg),
        }
    }
}

use std::result::Result as StdResult;

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the scheduling and materialization layers.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("Recurrence needs at least {required} occurrences, over the {cap} cap")]
    LimitExceeded { required: u32, cap: u32 },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = StdResult<T, EngineError>;

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => EngineError::StoreUnavailable(message),
        }
    }
}

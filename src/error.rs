use crate::domain::saga::ErrorInformation;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SagaError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SagaError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Saga already exists for key '{key}'")]
    ConflictError { key: String },
    #[error("Outbound action failed for saga '{key}': {reason}")]
    OutboundActionError { key: String, reason: String },
    #[error("No callback received for saga '{key}' within {seconds}s")]
    TimeoutError { key: String, seconds: u64 },
    #[error("Callback for saga '{key}' reported an error: {error_information}")]
    CallbackError {
        key: String,
        error_information: ErrorInformation,
    },
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Pub/sub error: {0}")]
    PubSubError(String),
    #[error("No saga found for key '{key}'")]
    NotFoundError { key: String },
}

impl SagaError {
    /// HTTP status the REST layer should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            SagaError::ValidationError(_) => 400,
            SagaError::NotFoundError { .. } => 404,
            SagaError::ConflictError { .. } => 409,
            SagaError::OutboundActionError { .. } | SagaError::CallbackError { .. } => 502,
            SagaError::TimeoutError { .. } => 504,
            SagaError::PersistenceError(_) | SagaError::PubSubError(_) => 500,
        }
    }

    /// Whether the error left the saga in its terminal `errored` state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaError::OutboundActionError { .. }
                | SagaError::TimeoutError { .. }
                | SagaError::CallbackError { .. }
        )
    }
}

impl From<serde_json::Error> for SagaError {
    fn from(e: serde_json::Error) -> Self {
        SagaError::PersistenceError(format!("Serialization error: {}", e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for SagaError {
    fn from(e: rocksdb::Error) -> Self {
        SagaError::PersistenceError(format!("RocksDB error: {}", e))
    }
}

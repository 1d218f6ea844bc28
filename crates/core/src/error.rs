use stratum_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StratumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session workspace error: {0}")]
    Session(String),
    #[error("Engine error: {0}")]
    Engine(#[from] ApiError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StratumError> for ApiError {
    fn from(err: StratumError) -> Self {
        match err {
            StratumError::Engine(api) => api,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StratumError>;

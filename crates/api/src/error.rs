use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Failure conditions surfaced to the tool layer.
///
/// Every variant maps to a stable machine-readable code (see [`ApiError::code`])
/// that callers relay verbatim together with the display message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("No project is loaded; call load with a project directory first")]
    NotLoaded,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
    #[error("Partial result: {0}")]
    PartialResult(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotLoaded => "NOT_LOADED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Timeout { .. } => "TIMEOUT",
            ApiError::PartialResult(_) => "PARTIAL_RESULT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Serializable form of an [`ApiError`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ApiError::NotLoaded.code(), "NOT_LOADED");
        assert_eq!(ApiError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(ApiError::InvalidInput("x".into()).code(), "INVALID_INPUT");
        assert_eq!(
            ApiError::Timeout {
                operation: "load".into(),
                seconds: 30
            }
            .code(),
            "TIMEOUT"
        );
        assert_eq!(ApiError::PartialResult("x".into()).code(), "PARTIAL_RESULT");
        assert_eq!(ApiError::Internal("x".into()).code(), "INTERNAL");
    }

    #[test]
    fn test_payload_carries_message() {
        let err = ApiError::Timeout {
            operation: "search_symbols".into(),
            seconds: 5,
        };
        let payload = err.to_payload();
        assert_eq!(payload.code, "TIMEOUT");
        assert!(payload.message.contains("search_symbols"));
        assert!(err.is_timeout());

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"code\":\"TIMEOUT\""));
    }
}

//! Application-level errors (wraps domain errors)

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::DomainError;

/// Machine-readable code carried by every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingQuery,
    InvalidQueryType,
    InvalidAnswer,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingQuery => "MISSING_QUERY",
            ErrorCode::InvalidQueryType => "INVALID_QUERY_TYPE",
            ErrorCode::InvalidAnswer => "INVALID_ANSWER",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Rejected input at the boundary. The only class shown to end users.
    #[error("{message}")]
    InvalidRequest {
        code: ErrorCode,
        message: String,
        suggestions: Vec<String>,
    },

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn invalid_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            code,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            ApplicationError::InvalidRequest { code, .. } => *code,
            ApplicationError::Domain(DomainError::EmptyQuery) => ErrorCode::MissingQuery,
            _ => ErrorCode::InternalError,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            ApplicationError::InvalidRequest { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// True for errors caused by the caller's input rather than a fault.
    pub fn is_bad_request(&self) -> bool {
        self.error_code() != ErrorCode::InternalError
    }
}

/// Wire shape of an error returned to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub mode: &'static str,
    pub error: String,
    #[serde(rename = "errorCode")]
    pub error_code: ErrorCode,
    pub suggestions: Vec<String>,
}

impl From<&ApplicationError> for ErrorResponse {
    fn from(err: &ApplicationError) -> Self {
        let error = if err.is_bad_request() {
            err.to_string()
        } else {
            "internal error, please try again later".to_string()
        };
        Self {
            mode: "error",
            error,
            error_code: err.error_code(),
            suggestions: err.suggestions().to_vec(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_query_when_mapping_then_missing_query() {
        let err = ApplicationError::from(DomainError::EmptyQuery);

        let response = ErrorResponse::from(&err);

        assert_eq!(response.error_code, ErrorCode::MissingQuery);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["errorCode"], "MISSING_QUERY");
        assert_eq!(json["mode"], "error");
    }

    #[test]
    fn given_cache_fault_when_mapping_then_hides_detail() {
        let err = ApplicationError::Cache {
            message: "value not serializable".into(),
        };

        let response = ErrorResponse::from(&err);

        assert_eq!(response.error_code, ErrorCode::InternalError);
        assert!(!response.error.contains("serializable"));
    }
}

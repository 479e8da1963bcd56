//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business logic violations.
/// Structural defects in a generated tree are not errors: they are repaired
/// and reported as diagnostics.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("no structured object found in generator response")]
    NoObjectFound,

    #[error("generator response is not valid JSON: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("tree cannot be serialized: {0}")]
    Unserializable(String),

    #[error("unknown generation strategy: {0}")]
    UnknownStrategy(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::{ApplicationError, ErrorResponse};
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use crate::exitcode;

        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                    exitcode::NOINPUT
                }
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Selector { .. } => exitcode::SOFTWARE,
                InfraError::Application(app) => match app {
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Domain(DomainError::UnknownStrategy(_)) => exitcode::CONFIG,
                    ApplicationError::Domain(
                        DomainError::NoObjectFound | DomainError::MalformedPayload(_),
                    ) => exitcode::DATAERR,
                    ApplicationError::OperationFailed { source, .. } => {
                        match source.downcast_ref::<std::io::Error>() {
                            Some(io) if io.kind() == std::io::ErrorKind::NotFound => {
                                exitcode::NOINPUT
                            }
                            _ => exitcode::IOERR,
                        }
                    }
                    other if other.is_bad_request() => exitcode::DATAERR,
                    _ => exitcode::SOFTWARE,
                },
            },
        }
    }

    /// Structured form for `--json` callers, if this error has one.
    pub fn response(&self) -> Option<ErrorResponse> {
        match self {
            CliError::Infra(InfraError::Application(app)) => Some(ErrorResponse::from(app)),
            _ => None,
        }
    }
}

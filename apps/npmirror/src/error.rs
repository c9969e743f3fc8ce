//! CLI error handling

use std::fmt;

use npmirror_errors::UserFacingError;
use npmirror_ops::RunFailure;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(npmirror_errors::ConfigError),
    /// Operations error
    Ops(npmirror_errors::Error),
    /// A mirror run stopped before completion
    Run(RunFailure),
    /// Component wiring error
    Setup(String),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

fn write_user_facing(f: &mut fmt::Formatter<'_>, e: &npmirror_errors::Error) -> fmt::Result {
    write!(f, "{}", e.user_message())?;
    if let Some(code) = e.user_code() {
        write!(f, "\n  Code: {code}")?;
    }
    if let Some(hint) = e.user_hint() {
        write!(f, "\n  Hint: {hint}")?;
    }
    if e.is_retryable() {
        write!(f, "\n  Retry: safe to retry this operation.")?;
    }
    Ok(())
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Ops(e) => write_user_facing(f, e),
            CliError::Run(failure) => {
                write!(f, "Run {} failed while {}: ", failure.run_id, failure.phase)?;
                write_user_facing(f, &failure.error)
            }
            CliError::Setup(msg) => write!(f, "Setup error: {msg}"),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Run(failure) => Some(&failure.error),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<npmirror_errors::ConfigError> for CliError {
    fn from(e: npmirror_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<npmirror_errors::Error> for CliError {
    fn from(e: npmirror_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<RunFailure> for CliError {
    fn from(failure: RunFailure) -> Self {
        CliError::Run(failure)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

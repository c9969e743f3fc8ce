//! Run coordination error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RunError {
    #[error("destination folder already exists: {path}")]
    DestinationExists { path: String },

    #[error("metadata lookup failed for {name}: {message}")]
    LookupFailed { name: String, message: String },

    #[error("run timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("archive failed for {path}: {message}")]
    ArchiveFailed { path: String, message: String },

    #[error("missing component: {component}")]
    MissingComponent { component: String },
}

impl UserFacingError for RunError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DestinationExists { .. } => {
                Some("Another run started in the same second; wait for the next trigger.")
            }
            Self::TimedOut { .. } => Some("Raise `run.timeout_secs` or check registry latency."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DestinationExists { .. } | Self::LookupFailed { .. } | Self::TimedOut { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DestinationExists { .. } => "run.destination_exists",
            Self::LookupFailed { .. } => "run.lookup_failed",
            Self::TimedOut { .. } => "run.timed_out",
            Self::ArchiveFailed { .. } => "run.archive_failed",
            Self::MissingComponent { .. } => "run.missing_component",
        };
        Some(code)
    }
}

use serde::{Deserialize, Serialize};

use crate::EventSource;
use npmirror_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod fetch;
pub mod general;
pub mod progress;
pub mod run;
pub mod schedule;

pub use fetch::*;
pub use general::*;
pub use progress::*;
pub use run::*;
pub use schedule::*;

/// Top-level application event enum that aggregates all domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Warnings, errors and debug output
    General(GeneralEvent),

    /// Status line updates
    Progress(ProgressEvent),

    /// Run lifecycle and milestones
    Run(RunEvent),

    /// Per-package fetch results
    Fetch(FetchEvent),

    /// Scheduler loop
    Schedule(ScheduleEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Progress(_) => EventSource::PROGRESS,
            Self::Run(_) => EventSource::RUN,
            Self::Fetch(_) => EventSource::FETCH,
            Self::Schedule(_) => EventSource::SCHEDULE,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. }) | Self::Run(RunEvent::Failed { .. }) => {
                Level::ERROR
            }

            Self::General(GeneralEvent::Warning { .. })
            | Self::Run(RunEvent::LookupFailed { .. })
            | Self::Fetch(FetchEvent::Failed { .. })
            | Self::Schedule(ScheduleEvent::TriggerSkipped { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Run(RunEvent::PhaseChanged { .. })
            | Self::Fetch(_)
            | Self::Schedule(ScheduleEvent::NextTrigger { .. }) => Level::DEBUG,

            Self::Progress(_) => Level::TRACE,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "npmirror::events::general",
            Self::Progress(_) => "npmirror::events::progress",
            Self::Run(_) => "npmirror::events::run",
            Self::Fetch(_) => "npmirror::events::fetch",
            Self::Schedule(_) => "npmirror::events::schedule",
        }
    }
}

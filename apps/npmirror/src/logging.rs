//! Structured logging integration for events
//!
//! Every event the handler receives is also written as a tracing record, at
//! the level carried in its metadata, with the domain payload flattened into
//! fields.

use npmirror_events::{
    AppEvent, EventLevel, EventMessage, FetchEvent, GeneralEvent, RunEvent, ScheduleEvent,
};

/// Log at the level stored in `meta`, always attaching the metadata fields
macro_rules! log_at {
    ($meta:expr, $target:literal, $($fields:tt)+) => {{
        let meta = $meta;
        match meta.level {
            EventLevel::Error => tracing::error!(
                target: $target,
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                $($fields)+
            ),
            EventLevel::Warn => tracing::warn!(
                target: $target,
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                $($fields)+
            ),
            EventLevel::Info => tracing::info!(
                target: $target,
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                $($fields)+
            ),
            EventLevel::Debug => tracing::debug!(
                target: $target,
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                $($fields)+
            ),
            EventLevel::Trace => tracing::trace!(
                target: $target,
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                $($fields)+
            ),
        }
    }};
}

/// Log an `EventMessage` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    match &message.event {
        AppEvent::General(event) => match event {
            GeneralEvent::Warning { message, context } => {
                log_at!(meta, "npmirror::events::general", context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                log_at!(meta, "npmirror::events::general", details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                log_at!(meta, "npmirror::events::general", context = ?context, "{message}");
            }
        },

        // The status line is rendered, not logged
        AppEvent::Progress(_) => {}

        AppEvent::Run(event) => match event {
            RunEvent::Started {
                run_id,
                started_at,
                dest_folder,
            } => {
                log_at!(
                    meta,
                    "npmirror::events::run",
                    run_id = %run_id,
                    started_at = %started_at,
                    dest_folder = %dest_folder.display(),
                    "Run started"
                );
            }
            RunEvent::PhaseChanged { run_id, phase } => {
                log_at!(
                    meta,
                    "npmirror::events::run",
                    run_id = %run_id,
                    phase = %phase,
                    "Phase changed"
                );
            }
            RunEvent::Milestone { run_id, message } => {
                log_at!(meta, "npmirror::events::run", run_id = %run_id, "{message}");
            }
            RunEvent::LookupFailed {
                run_id,
                package,
                failure,
            } => {
                log_at!(
                    meta,
                    "npmirror::events::run",
                    run_id = %run_id,
                    package = %package,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    message = %failure.message,
                    "Lookup failed"
                );
            }
            RunEvent::Completed { report } => {
                log_at!(
                    meta,
                    "npmirror::events::run",
                    run_id = %report.run_id,
                    archive = %report.archive_path.display(),
                    new_packages = report.new_packages,
                    resolved = report.resolved_dependencies,
                    fetched = report.fetch.fulfilled,
                    cached = report.fetch.cached,
                    duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
                    "Run completed"
                );
            }
            RunEvent::Failed {
                run_id,
                phase,
                failure,
            } => {
                log_at!(
                    meta,
                    "npmirror::events::run",
                    run_id = %run_id,
                    phase = %phase,
                    code = ?failure.code,
                    hint = ?failure.hint,
                    retryable = failure.retryable,
                    message = %failure.message,
                    "Run failed"
                );
            }
        },

        AppEvent::Fetch(event) => match event {
            FetchEvent::CacheHit { package, path } => {
                log_at!(
                    meta,
                    "npmirror::events::fetch",
                    package = %package,
                    path = %path.display(),
                    "Cache hit"
                );
            }
            FetchEvent::Downloaded { package, bytes } => {
                log_at!(
                    meta,
                    "npmirror::events::fetch",
                    package = %package,
                    bytes = bytes,
                    "Downloaded"
                );
            }
            FetchEvent::VersionRecorded { package, version } => {
                log_at!(
                    meta,
                    "npmirror::events::fetch",
                    package = %package,
                    version = %version,
                    "Version recorded"
                );
            }
            FetchEvent::Failed { package, failure } => {
                log_at!(
                    meta,
                    "npmirror::events::fetch",
                    package = %package,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    message = %failure.message,
                    "Fetch failed"
                );
            }
        },

        AppEvent::Schedule(event) => match event {
            ScheduleEvent::Started {
                expression,
                run_on_start,
            } => {
                log_at!(
                    meta,
                    "npmirror::events::schedule",
                    expression = %expression,
                    run_on_start = run_on_start,
                    "Scheduler started"
                );
            }
            ScheduleEvent::NextTrigger { at } => {
                log_at!(meta, "npmirror::events::schedule", at = %at, "Next trigger");
            }
            ScheduleEvent::Triggered { at } => {
                log_at!(meta, "npmirror::events::schedule", at = %at, "Triggered");
            }
            ScheduleEvent::TriggerSkipped { scheduled_for } => {
                log_at!(
                    meta,
                    "npmirror::events::schedule",
                    scheduled_for = %scheduled_for,
                    "Trigger skipped while a run was active"
                );
            }
            ScheduleEvent::Stopped { runs } => {
                log_at!(meta, "npmirror::events::schedule", runs = runs, "Scheduler stopped");
            }
        },
    }
}

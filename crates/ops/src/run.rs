//! Run coordination
//!
//! One run walks `DetectingChanges → ResolvingDependencies →
//! CreatingDestFolder → Fetching → Archiving → CleaningUp → Done`. Any stage
//! failure moves it to `Failed`; the destination folder is only created once
//! resolution has succeeded and only removed once the archive is written.

use crate::detect::{detect_changes, LookupLimits};
use crate::expand::expand;
use crate::fetch::fetch_all;
use crate::MirrorCtx;
use npmirror_errors::{Error, RunError, StorageError, UserFacingError};
use npmirror_events::{AppEvent, EventEmitter, FailureContext, RunEvent};
use npmirror_types::{FetchSummary, RunDuration, RunPhase, RunRecord, RunReport, RunTimestamp};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// A run that stopped before `Done`
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub run_id: Uuid,
    /// Phase the run was in when it failed
    pub phase: RunPhase,
    pub error: Error,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run failed while {}: {}", self.phase, self.error)
    }
}

impl std::error::Error for RunFailure {}

/// Settled result of a guarded run
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    Failed(RunFailure),
}

impl RunOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

struct RunState {
    record: RunRecord,
    phase: RunPhase,
}

/// Drives single end-to-end runs
#[derive(Clone)]
pub struct RunCoordinator {
    ctx: Arc<MirrorCtx>,
}

impl RunCoordinator {
    #[must_use]
    pub fn new(ctx: Arc<MirrorCtx>) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &MirrorCtx {
        &self.ctx
    }

    /// Execute one run now
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] naming the phase that failed.
    pub async fn run_once(&self) -> Result<RunReport, RunFailure> {
        let started_at = RunTimestamp::now();
        let mut state = RunState {
            record: RunRecord::start(&self.ctx.config.output_dir(), started_at),
            phase: RunPhase::Idle,
        };
        let run_id = state.record.run_id;
        let timer = Instant::now();

        self.ctx.emit_correlated(
            AppEvent::Run(RunEvent::Started {
                run_id,
                started_at: started_at.display(),
                dest_folder: state.record.dest_folder.clone(),
            }),
            run_id.to_string(),
        );
        self.milestone(run_id, format!("Run started {}", started_at.display()));

        let result = match self.ctx.config.run_timeout() {
            Some(limit) => match tokio::time::timeout(limit, self.execute(&mut state)).await {
                Ok(result) => result,
                Err(_) => Err(RunError::TimedOut {
                    seconds: limit.as_secs(),
                }
                .into()),
            },
            None => self.execute(&mut state).await,
        };
        self.ctx.progress.hide();
        state.record.finish();

        match result {
            Ok((counts, fetch, archive_path)) => {
                let duration = timer.elapsed();
                let report = RunReport {
                    run_id,
                    dest_folder: state.record.dest_folder.clone(),
                    archive_path,
                    new_packages: counts.new_packages,
                    failed_lookups: counts.failed_lookups,
                    resolved_dependencies: counts.resolved,
                    fetch,
                    duration,
                };
                self.milestone(run_id, format!("Duration: {}", RunDuration(duration)));
                self.ctx.emit_correlated(
                    AppEvent::Run(RunEvent::Completed {
                        report: report.clone(),
                    }),
                    run_id.to_string(),
                );
                Ok(report)
            }
            Err(error) => {
                let phase = state.phase;
                self.enter(&mut state, RunPhase::Failed);
                Err(RunFailure {
                    run_id,
                    phase,
                    error,
                })
            }
        }
    }

    /// Execute one run, settling any failure into [`RunOutcome::Failed`]
    pub async fn run_guarded(&self) -> RunOutcome {
        match self.run_once().await {
            Ok(report) => RunOutcome::Completed(report),
            Err(failure) => {
                tracing::error!(
                    run_id = %failure.run_id,
                    phase = %failure.phase,
                    code = failure.error.user_code().unwrap_or("unknown"),
                    "{}",
                    failure.error
                );
                self.ctx.emit_correlated(
                    AppEvent::Run(RunEvent::Failed {
                        run_id: failure.run_id,
                        phase: failure.phase,
                        failure: FailureContext::from_error(&failure.error),
                    }),
                    failure.run_id.to_string(),
                );
                RunOutcome::Failed(failure)
            }
        }
    }

    async fn execute(
        &self,
        state: &mut RunState,
    ) -> Result<(StageCounts, FetchSummary, std::path::PathBuf), Error> {
        let ctx = &self.ctx;
        let run_id = state.record.run_id;

        self.enter(state, RunPhase::DetectingChanges);
        let records = ctx.store.find_all().await?;
        let changes = detect_changes(
            &records,
            Arc::clone(&ctx.registry),
            ctx.progress.as_ref(),
            LookupLimits::from_config(&ctx.config),
        )
        .await?;
        ctx.progress.hide();
        for failure in &changes.failed {
            let error = RunError::LookupFailed {
                name: failure.name.clone(),
                message: failure.message.clone(),
            };
            ctx.emit_correlated(
                AppEvent::Run(RunEvent::LookupFailed {
                    run_id,
                    package: failure.name.clone(),
                    failure: FailureContext::from_error(&error),
                }),
                run_id.to_string(),
            );
        }
        self.milestone(
            run_id,
            format!(
                "Get new packages completed with {} new packages",
                changes.requests.len()
            ),
        );

        self.enter(state, RunPhase::ResolvingDependencies);
        let dependencies = expand(
            ctx.resolver.as_ref(),
            &changes.requests,
            ctx.progress.as_ref(),
        )
        .await?;
        ctx.progress.hide();
        self.milestone(
            run_id,
            format!(
                "Resolving dependencies completed with {} packages",
                dependencies.len()
            ),
        );

        self.enter(state, RunPhase::CreatingDestFolder);
        let dest_folder = state.record.dest_folder.clone();
        create_dest_folder(&dest_folder).await?;

        self.enter(state, RunPhase::Fetching);
        let outcomes = fetch_all(ctx, &dependencies, &dest_folder, ctx.config.run.use_cache).await;
        let summary = FetchSummary::from_outcomes(&outcomes);
        ctx.progress.hide();
        self.milestone(
            run_id,
            format!(
                "Fetching packages completed with {summary} packages ({} packages already in cache)",
                summary.cached
            ),
        );

        self.enter(state, RunPhase::Archiving);
        let archive_path = ctx.archiver.archive(&dest_folder).await?;
        self.milestone(run_id, format!("Archive created at {}", archive_path.display()));

        self.enter(state, RunPhase::CleaningUp);
        tokio::fs::remove_dir_all(&dest_folder)
            .await
            .map_err(|e| Error::io_with_path(&e, &dest_folder))?;

        self.enter(state, RunPhase::Done);
        let counts = StageCounts {
            new_packages: changes.requests.len(),
            failed_lookups: changes.failed.len(),
            resolved: dependencies.len(),
        };
        Ok((counts, summary, archive_path))
    }

    fn enter(&self, state: &mut RunState, phase: RunPhase) {
        state.phase = phase;
        tracing::debug!(run_id = %state.record.run_id, %phase, "run phase");
        self.ctx.emit_correlated(
            AppEvent::Run(RunEvent::PhaseChanged {
                run_id: state.record.run_id,
                phase,
            }),
            state.record.run_id.to_string(),
        );
    }

    fn milestone(&self, run_id: Uuid, message: String) {
        self.ctx.emit_correlated(
            AppEvent::Run(RunEvent::Milestone { run_id, message }),
            run_id.to_string(),
        );
    }
}

struct StageCounts {
    new_packages: usize,
    failed_lookups: usize,
    resolved: usize,
}

/// Create the run folder, refusing to reuse an existing one
async fn create_dest_folder(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    match tokio::fs::create_dir(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(RunError::DestinationExists {
            path: path.display().to_string(),
        }
        .into()),
        Err(e) => Err(StorageError::from_io_with_path(&e, path).into()),
    }
}

//! Fetch orchestration
//!
//! Every resolved dependency is fetched independently through the shared
//! cache into the run folder. Failures are settled into [`FetchOutcome`]s
//! and never stop the batch.

use crate::MirrorCtx;
use futures::stream::{FuturesUnordered, StreamExt};
use npmirror_config::resources_semaphore::{acquire_semaphore_permit, create_semaphore};
use npmirror_errors::{Error, FetchError};
use npmirror_events::progress::fraction;
use npmirror_events::{AppEvent, EventEmitter, FailureContext, FetchEvent};
use npmirror_store::copy_to;
use npmirror_types::{FailureReason, FetchOutcome, FetchSource, ResolvedDependency};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fetch `dependencies` into `dest_folder`
///
/// Returns exactly one outcome per input, in input order.
pub async fn fetch_all(
    ctx: &MirrorCtx,
    dependencies: &[ResolvedDependency],
    dest_folder: &Path,
    use_cache: bool,
) -> Vec<FetchOutcome> {
    let total = dependencies.len();
    if total == 0 {
        ctx.progress.show("Fetching: done", 1.0);
        return Vec::new();
    }

    let semaphore = create_semaphore(ctx.config.concurrency.downloads);
    let mut pending = FuturesUnordered::new();
    for (index, dep) in dependencies.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        pending.push(async move {
            let result = match acquire_semaphore_permit(semaphore, "downloads").await {
                Ok(_permit) => fetch_one(ctx, dep, dest_folder, use_cache).await,
                Err(e) => Err(FetchError::TaskFailed {
                    package: dep.to_string(),
                    message: e.to_string(),
                }
                .into()),
            };
            (index, dep, result)
        });
    }

    let mut outcomes: Vec<Option<FetchOutcome>> = vec![None; total];
    let mut settled = 0usize;
    while let Some((index, dep, result)) = pending.next().await {
        settled += 1;
        let outcome = match result {
            Ok((path, source)) => FetchOutcome::Fulfilled { path, source },
            Err(error) => {
                tracing::warn!(package = %dep, error = %error, "fetch failed");
                ctx.emit(AppEvent::Fetch(FetchEvent::Failed {
                    package: dep.to_string(),
                    failure: FailureContext::from_error(&error),
                }));
                FetchOutcome::Rejected {
                    reason: FailureReason::from_error(&error),
                }
            }
        };
        ctx.progress
            .show(&format!("Fetching: {dep}"), fraction(settled, total));
        outcomes[index] = Some(outcome);
    }

    outcomes
        .into_iter()
        .zip(dependencies)
        .map(|(outcome, dep)| {
            outcome.unwrap_or_else(|| FetchOutcome::Rejected {
                reason: FailureReason::from_error(&Error::from(FetchError::TaskFailed {
                    package: dep.to_string(),
                    message: "fetch was not settled".to_string(),
                })),
            })
        })
        .collect()
}

async fn fetch_one(
    ctx: &MirrorCtx,
    dep: &ResolvedDependency,
    dest_folder: &Path,
    use_cache: bool,
) -> Result<(PathBuf, FetchSource), Error> {
    let dest = dest_folder.join(dep.relative_path());

    if use_cache {
        if let Some(cached) = ctx.cache.lookup(dep).await {
            copy_into(dep, &cached, &dest).await?;
            ctx.emit(AppEvent::Fetch(FetchEvent::CacheHit {
                package: dep.to_string(),
                path: cached,
            }));
            record(ctx, dep).await;
            return Ok((dest, FetchSource::Cache));
        }
    }

    let tarballs = Arc::clone(&ctx.tarballs);
    let download = |tmp: PathBuf| async move {
        tarballs.download(dep, &tmp).await.map_err(|e| {
            Error::from(FetchError::DownloadFailed {
                package: dep.to_string(),
                message: e.to_string(),
            })
        })
    };
    let written = if use_cache {
        ctx.cache.store_with(dep, download).await
    } else {
        ctx.cache.refresh_with(dep, download).await
    }
    .map_err(|e| match e {
        Error::Fetch(_) => e,
        other => FetchError::CacheWriteFailed {
            package: dep.to_string(),
            message: other.to_string(),
        }
        .into(),
    })?;

    copy_into(dep, &written.path, &dest).await?;
    let source = if written.fresh {
        ctx.emit(AppEvent::Fetch(FetchEvent::Downloaded {
            package: dep.to_string(),
            bytes: written.bytes,
        }));
        FetchSource::Network
    } else {
        // another fetch in this batch wrote it while we waited
        FetchSource::Cache
    };
    record(ctx, dep).await;
    Ok((dest, source))
}

async fn copy_into(dep: &ResolvedDependency, src: &Path, dest: &Path) -> Result<(), Error> {
    copy_to(src, dest).await.map(|_| ()).map_err(|e| {
        FetchError::CopyFailed {
            package: dep.to_string(),
            dest: dest.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Mark the version mirrored; a store failure only costs a re-fetch next run
async fn record(ctx: &MirrorCtx, dep: &ResolvedDependency) {
    let version = dep.version.to_string();
    match ctx.store.record_version(&dep.name, &version).await {
        Ok(()) => ctx.emit(AppEvent::Fetch(FetchEvent::VersionRecorded {
            package: dep.name.clone(),
            version,
        })),
        Err(e) => {
            tracing::warn!(package = %dep, error = %e, "failed to record mirrored version");
            ctx.emit_warning_with_context(
                format!("could not record {dep} as mirrored"),
                e.to_string(),
            );
        }
    }
}

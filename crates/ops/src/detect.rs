//! Change detection
//!
//! Compares every tracked package against the registry's current `latest`
//! and keeps the ones whose latest version has not been mirrored yet.

use futures::stream::{FuturesUnordered, StreamExt};
use npmirror_config::resources_semaphore::{acquire_semaphore_permit, create_semaphore};
use npmirror_config::Config;
use npmirror_errors::{Error, RunError};
use npmirror_events::progress::fraction;
use npmirror_events::ProgressReporter;
use npmirror_net::PackumentSource;
use npmirror_types::{LookupFailure, PackageRequests, TrackedPackage, LATEST_TAG};
use std::sync::Arc;

/// Packages to mirror this run, plus the lookups that failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub requests: PackageRequests,
    /// Sorted by package name
    pub failed: Vec<LookupFailure>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// How metadata lookups run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupLimits {
    pub max_concurrent: usize,
    /// Fail on the first lookup error instead of skipping the package
    pub strict: bool,
}

impl LookupLimits {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.concurrency.metadata_lookups,
            strict: config.run.strict_lookups,
        }
    }
}

impl Default for LookupLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            strict: false,
        }
    }
}

/// Find tracked packages with an unmirrored latest version
///
/// # Errors
///
/// Only in strict mode: the first failed lookup is returned as
/// `RunError::LookupFailed`.
pub async fn detect_changes(
    records: &[TrackedPackage],
    registry: Arc<dyn PackumentSource>,
    progress: &dyn ProgressReporter,
    limits: LookupLimits,
) -> Result<ChangeSet, Error> {
    let mut changes = ChangeSet::default();
    if records.is_empty() {
        progress.show("Get new packages: done", 1.0);
        return Ok(changes);
    }

    let semaphore = create_semaphore(limits.max_concurrent);
    let mut pending = FuturesUnordered::new();
    for record in records {
        let registry = Arc::clone(&registry);
        let semaphore = Arc::clone(&semaphore);
        pending.push(async move {
            let result = match acquire_semaphore_permit(semaphore, "metadata lookups").await {
                Ok(_permit) => registry.metadata(&record.name).await,
                Err(e) => Err(e),
            };
            (record, result)
        });
    }

    let total = records.len();
    let mut processed = 0usize;
    while let Some((record, result)) = pending.next().await {
        processed += 1;
        match result {
            Ok(metadata) => {
                progress.show(
                    &format!("Get new packages: {}@{}", record.name, metadata.latest_version),
                    fraction(processed, total),
                );
                if !record.knows(&metadata.latest_version) {
                    tracing::debug!(
                        package = %record.name,
                        latest = %metadata.latest_version,
                        "new version available"
                    );
                    changes
                        .requests
                        .insert(record.name.clone(), LATEST_TAG.to_string());
                }
            }
            Err(error) if limits.strict => {
                return Err(RunError::LookupFailed {
                    name: record.name.clone(),
                    message: error.to_string(),
                }
                .into());
            }
            Err(error) => {
                tracing::warn!(package = %record.name, error = %error, "metadata lookup failed");
                progress.show(
                    &format!("Get new packages: {}", record.name),
                    fraction(processed, total),
                );
                changes.failed.push(LookupFailure {
                    name: record.name.clone(),
                    message: error.to_string(),
                });
            }
        }
    }

    changes.failed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(changes)
}

//! Dependency expansion

use npmirror_errors::Error;
use npmirror_events::ProgressReporter;
use npmirror_resolver::DependencyResolver;
use npmirror_types::{PackageRequests, ResolvedDependency};

/// Expand `requests` into the sorted closure with one entry per `(name, version)`
///
/// # Errors
///
/// Propagates the resolver's failure; no partial closure is returned.
pub async fn expand(
    resolver: &dyn DependencyResolver,
    requests: &PackageRequests,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ResolvedDependency>, Error> {
    let mut resolved = resolver.resolve(requests, progress).await?;
    resolved.sort();
    resolved.dedup_by(|a, b| a.name == b.name && a.version == b.version);
    Ok(resolved)
}

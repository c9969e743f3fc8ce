#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency resolution for npmirror
//!
//! Expands a set of `name -> spec` requests into the transitive,
//! deduplicated closure of concrete registry packages, using npm range
//! semantics for every edge.

mod graph;
mod resolver;

pub use graph::{DepEdge, DepKind, DependencyGraph, Insertion, Target};
pub use resolver::Resolver;

use async_trait::async_trait;
use npmirror_errors::Error;
use npmirror_events::ProgressReporter;
use npmirror_types::{PackageRequests, ResolvedDependency};

/// Turns package requests into a dependency closure
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Resolve `requests` and everything they depend on
    ///
    /// The result holds each `(name, version)` once, sorted. Any
    /// unresolvable required edge fails the whole batch.
    async fn resolve(
        &self,
        requests: &PackageRequests,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ResolvedDependency>, Error>;
}

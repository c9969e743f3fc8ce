use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-package fetch events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetchEvent {
    /// Tarball served from the package cache
    CacheHit { package: String, path: PathBuf },

    /// Tarball downloaded into the package cache
    Downloaded { package: String, bytes: u64 },

    /// Version written to the tracked-record store
    VersionRecorded { package: String, version: String },

    /// Fetch rejected; the batch continues
    Failed {
        package: String,
        failure: super::FailureContext,
    },
}

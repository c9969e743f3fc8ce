#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the npmirror sync job
//!
//! This crate provides the data model shared by every stage of a mirror run:
//! tracked records, registry documents, resolved dependencies, fetch outcomes,
//! run bookkeeping and npm version ranges.

pub mod fetch;
pub mod package;
pub mod run;
pub mod version;

// Re-export commonly used types
pub use fetch::{FailureReason, FetchOutcome, FetchSource, FetchSummary};
pub use package::{
    Dist, LookupFailure, PackageMetadata, PackageRequests, Packument, ResolvedDependency,
    TrackedPackage, VersionManifest,
};
pub use run::{RunDuration, RunPhase, RunRecord, RunReport, RunTimestamp};
pub use semver::Version;
pub use uuid::Uuid;
pub use version::{ComparatorSet, VersionConstraint, VersionRange, VersionSpec};

use serde::{Deserialize, Serialize};

/// Dist-tag the change detector requests for every new package
pub const LATEST_TAG: &str = "latest";

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}

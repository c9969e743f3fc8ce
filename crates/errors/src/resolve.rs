//! Dependency resolution error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ResolveError {
    #[error("no version of {name} satisfies {spec}")]
    NoSatisfyingVersion { name: String, spec: String },

    #[error("unknown dist-tag {tag} for {name}")]
    UnknownTag { name: String, tag: String },

    #[error("unsupported dependency specifier for {name}: {spec}")]
    UnsupportedSpec { name: String, spec: String },

    #[error("failed to load metadata for {name}: {message}")]
    MetadataUnavailable { name: String, message: String },

    #[error("version {version} of {name} is listed but has no manifest")]
    MissingManifest { name: String, version: String },
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedSpec { .. } => Some(
                "Only registry dependencies can be mirrored; git, file and URL specs are not supported.",
            ),
            Self::MetadataUnavailable { .. } => {
                Some("Check registry connectivity and retry the run.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::MetadataUnavailable { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoSatisfyingVersion { .. } => "resolve.no_satisfying_version",
            Self::UnknownTag { .. } => "resolve.unknown_tag",
            Self::UnsupportedSpec { .. } => "resolve.unsupported_spec",
            Self::MetadataUnavailable { .. } => "resolve.metadata_unavailable",
            Self::MissingManifest { .. } => "resolve.missing_manifest",
        };
        Some(code)
    }
}

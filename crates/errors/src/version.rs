//! Version and range parsing errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    /// A dist-tag or manifest carries a string that is not semver
    #[error("invalid version: {message}")]
    InvalidVersion { message: String },

    #[error("invalid version range `{input}`")]
    InvalidRange { input: String },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersion { .. } => {
                Some("The registry published a malformed version; check the package's dist-tags.")
            }
            Self::InvalidRange { .. } => {
                Some("Use npm range syntax such as `^1.2.0`, `~1.2.3`, `1.x` or `>=1.0.0 <2.0.0`.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::InvalidRange { .. } => "version.invalid_range",
        })
    }
}

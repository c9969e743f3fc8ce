//! Per-package fetch error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum FetchError {
    #[error("failed to download {package}: {message}")]
    DownloadFailed { package: String, message: String },

    #[error("failed to write {package} to cache: {message}")]
    CacheWriteFailed { package: String, message: String },

    #[error("failed to copy {package} into {dest}: {message}")]
    CopyFailed {
        package: String,
        dest: String,
        message: String,
    },

    #[error("fetch task failed for {package}: {message}")]
    TaskFailed { package: String, message: String },
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::DownloadFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DownloadFailed { .. } => "fetch.download_failed",
            Self::CacheWriteFailed { .. } => "fetch.cache_write_failed",
            Self::CopyFailed { .. } => "fetch.copy_failed",
            Self::TaskFailed { .. } => "fetch.task_failed",
        };
        Some(code)
    }
}

//! Registry metadata lookup error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RegistryError {
    #[error("package not found in registry: {name}")]
    NotFound { name: String },

    #[error("invalid registry document for {name}: {message}")]
    InvalidDocument { name: String, message: String },

    #[error("package {name} has no `latest` dist-tag")]
    MissingLatest { name: String },
}

impl UserFacingError for RegistryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => {
                Some("The package may have been unpublished; run `npmirror untrack` to drop it.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "registry.not_found",
            Self::InvalidDocument { .. } => "registry.invalid_document",
            Self::MissingLatest { .. } => "registry.missing_latest",
        };
        Some(code)
    }
}

//! Settled results of fetching resolved dependencies

use npmirror_errors::UserFacingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a fulfilled tarball came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Cache,
    Network,
}

/// Why a single fetch was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub code: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl FailureReason {
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(str::to_string),
            message: error.user_message().into_owned(),
            retryable: error.is_retryable(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Outcome of fetching one dependency; one per input, never thrown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome {
    Fulfilled { path: PathBuf, source: FetchSource },
    Rejected { reason: FailureReason },
}

impl FetchOutcome {
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(
            self,
            Self::Fulfilled {
                source: FetchSource::Cache,
                ..
            }
        )
    }
}

/// Totals over a batch of fetch outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub total: usize,
    pub fulfilled: usize,
    pub cached: usize,
}

impl FetchSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[FetchOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            if outcome.is_fulfilled() {
                summary.fulfilled += 1;
            }
            if outcome.is_cached() {
                summary.cached += 1;
            }
        }
        summary
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.total - self.fulfilled
    }
}

/// Renders `N` when every fetch succeeded and `X/N` otherwise
impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fulfilled == self.total {
            write!(f, "{}", self.total)
        } else {
            write!(f, "{}/{}", self.fulfilled, self.total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npmirror_errors::FetchError;

    fn fulfilled(source: FetchSource) -> FetchOutcome {
        FetchOutcome::Fulfilled {
            path: PathBuf::from("a/-/a-1.0.0.tgz"),
            source,
        }
    }

    #[test]
    fn test_summary_all_fulfilled() {
        let outcomes = [fulfilled(FetchSource::Network), fulfilled(FetchSource::Cache)];
        let summary = FetchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.rejected(), 0);
        assert_eq!(summary.to_string(), "2");
    }

    #[test]
    fn test_summary_partial_failure() {
        let err = FetchError::DownloadFailed {
            package: "b@2.0.0".into(),
            message: "connection reset".into(),
        };
        let outcomes = [
            fulfilled(FetchSource::Network),
            FetchOutcome::Rejected {
                reason: FailureReason::from_error(&err),
            },
        ];
        let summary = FetchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.to_string(), "1/2");
        assert_eq!(summary.rejected(), 1);
    }

    #[test]
    fn test_summary_empty() {
        let summary = FetchSummary::from_outcomes(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.to_string(), "0");
    }
}

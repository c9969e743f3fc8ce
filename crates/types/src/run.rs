//! Run bookkeeping: timestamps, phases, records and reports

use crate::FetchSummary;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Start time of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTimestamp(DateTime<Local>);

impl RunTimestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Local::now())
    }

    #[must_use]
    pub fn from_datetime(at: DateTime<Local>) -> Self {
        Self(at)
    }

    #[must_use]
    pub fn datetime(&self) -> DateTime<Local> {
        self.0
    }

    /// Destination folder name, `MMDDYYYY.HHmmss`
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.0.format("%m%d%Y.%H%M%S").to_string()
    }

    /// Banner form, `DD/MM/YYYY hh:mm:ss` on a 12-hour clock
    #[must_use]
    pub fn display(&self) -> String {
        self.0.format("%d/%m/%Y %I:%M:%S").to_string()
    }
}

/// Stage of a run's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    DetectingChanges,
    ResolvingDependencies,
    CreatingDestFolder,
    Fetching,
    Archiving,
    CleaningUp,
    Done,
    Failed,
}

impl RunPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DetectingChanges => "detecting changes",
            Self::ResolvingDependencies => "resolving dependencies",
            Self::CreatingDestFolder => "creating destination folder",
            Self::Fetching => "fetching",
            Self::Archiving => "archiving",
            Self::CleaningUp => "cleaning up",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// One run's identity and working folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: RunTimestamp,
    pub dest_folder: PathBuf,
    pub ended_at: Option<DateTime<Local>>,
}

impl RunRecord {
    /// Start a run whose destination folder lives under `output_dir`
    #[must_use]
    pub fn start(output_dir: &Path, started_at: RunTimestamp) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            dest_folder: output_dir.join(started_at.folder_name()),
            ended_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Local::now());
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub dest_folder: PathBuf,
    pub archive_path: PathBuf,
    pub new_packages: usize,
    pub failed_lookups: usize,
    pub resolved_dependencies: usize,
    pub fetch: FetchSummary,
    pub duration: Duration,
}

/// Elapsed time rendered as `HH:MM:SS:mmm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDuration(pub Duration);

impl fmt::Display for RunDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        write!(
            f,
            "{:02}:{:02}:{:02}:{}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            self.0.subsec_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> RunTimestamp {
        RunTimestamp::from_datetime(Local.with_ymd_and_hms(2024, 3, 7, 8, 5, 9).unwrap())
    }

    #[test]
    fn test_folder_name_format() {
        assert_eq!(timestamp().folder_name(), "03072024.080509");
    }

    #[test]
    fn test_banner_format() {
        assert_eq!(timestamp().display(), "07/03/2024 08:05:09");
        let afternoon =
            RunTimestamp::from_datetime(Local.with_ymd_and_hms(2024, 3, 7, 15, 5, 9).unwrap());
        assert_eq!(afternoon.display(), "07/03/2024 03:05:09");
    }

    #[test]
    fn test_duration_format() {
        let d = RunDuration(Duration::from_millis(3_723_045));
        assert_eq!(d.to_string(), "01:02:03:45");
        assert_eq!(RunDuration(Duration::ZERO).to_string(), "00:00:00:0");
    }

    #[test]
    fn test_record_paths() {
        let record = RunRecord::start(Path::new("/srv/mirror"), timestamp());
        assert_eq!(record.dest_folder, PathBuf::from("/srv/mirror/03072024.080509"));
        assert!(record.ended_at.is_none());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(RunPhase::Done.is_terminal());
        assert!(RunPhase::Failed.is_terminal());
        assert!(!RunPhase::Archiving.is_terminal());
    }
}

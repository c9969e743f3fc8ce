use serde::{Deserialize, Serialize};
use npmirror_types::{RunPhase, RunReport};
use std::path::PathBuf;
use uuid::Uuid;

/// Run coordinator events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// Run accepted, destination folder chosen
    Started {
        run_id: Uuid,
        started_at: String,
        dest_folder: PathBuf,
    },

    /// State machine moved to a new phase
    PhaseChanged { run_id: Uuid, phase: RunPhase },

    /// Human-readable stage result line
    Milestone { run_id: Uuid, message: String },

    /// A tracked package could not be looked up and was skipped
    LookupFailed {
        run_id: Uuid,
        package: String,
        failure: super::FailureContext,
    },

    /// Run reached `Done`
    Completed { report: RunReport },

    /// Run aborted in `phase`
    Failed {
        run_id: Uuid,
        phase: RunPhase,
        failure: super::FailureContext,
    },
}

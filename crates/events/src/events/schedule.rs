use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Scheduler loop events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScheduleEvent {
    Started {
        expression: String,
        run_on_start: bool,
    },

    /// Next trigger computed
    NextTrigger { at: DateTime<Local> },

    /// Trigger fired and a run begins
    Triggered { at: DateTime<Local> },

    /// Trigger time passed while a run was active
    TriggerSkipped { scheduled_for: DateTime<Local> },

    /// Shutdown requested or no further triggers
    Stopped { runs: u64 },
}

use serde::{Deserialize, Serialize};

/// Single-line progress status for the current stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// Status line replaced with a new message; `percent` is in `[0, 1]`
    Shown { message: String, percent: f64 },

    /// Status line cleared
    Hidden,
}

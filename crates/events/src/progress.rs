//! Stage progress observer
//!
//! Stages report a message and a completion fraction after every settled
//! item. The CLI renders the resulting [`ProgressEvent`]s as one status line.

use crate::{AppEvent, EventEmitter, EventSender, ProgressEvent};

/// Observer for stage progress
pub trait ProgressReporter: Send + Sync {
    /// Replace the status line; `percent` is clamped to `[0, 1]`
    fn show(&self, message: &str, percent: f64);

    /// Clear the status line
    fn hide(&self);
}

/// Reporter that forwards progress onto the event channel
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    tx: EventSender,
}

impl ProgressHandle {
    #[must_use]
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl EventEmitter for ProgressHandle {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl ProgressReporter for ProgressHandle {
    fn show(&self, message: &str, percent: f64) {
        self.emit(AppEvent::Progress(ProgressEvent::Shown {
            message: message.to_string(),
            percent: percent.clamp(0.0, 1.0),
        }));
    }

    fn hide(&self) {
        self.emit(AppEvent::Progress(ProgressEvent::Hidden));
    }
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn show(&self, _message: &str, _percent: f64) {}

    fn hide(&self) {}
}

/// Fraction of `done` over `total`, treating an empty batch as complete
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;

    #[tokio::test]
    async fn test_progress_handle_clamps() {
        let (tx, mut rx) = channel();
        let handle = ProgressHandle::new(tx);
        handle.show("Fetching: a@1.0.0", 1.5);
        handle.hide();

        let first = rx.recv().await.unwrap();
        match first.event {
            AppEvent::Progress(ProgressEvent::Shown { message, percent }) => {
                assert_eq!(message, "Fetching: a@1.0.0");
                assert!((percent - 1.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event {other:?}"),
        }
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.event, AppEvent::Progress(ProgressEvent::Hidden)));
    }

    #[test]
    fn test_fraction() {
        assert!((fraction(0, 0) - 1.0).abs() < f64::EPSILON);
        assert!((fraction(1, 4) - 0.25).abs() < f64::EPSILON);
    }
}

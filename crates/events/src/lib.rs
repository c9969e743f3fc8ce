#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in npmirror
//!
//! Library crates never print. Everything a user or log file sees is sent as
//! an [`AppEvent`] over an unbounded channel and rendered by the CLI.
//!
//! ## Architecture
//!
//! - **Domain events**: grouped by functional domain (Run, Fetch, Schedule, ...)
//! - **Unified `EventEmitter` trait**: one API for every emission
//! - **Progress observer**: [`ProgressReporter`] turns stage progress into events

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod progress;
pub use progress::{NoProgress, ProgressHandle, ProgressReporter};

pub mod events;
pub use events::{
    AppEvent, FailureContext, FetchEvent, GeneralEvent, ProgressEvent, RunEvent, ScheduleEvent,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// An event together with its emission metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    #[must_use]
    pub fn new(meta: EventMeta, event: AppEvent) -> Self {
        Self { meta, event }
    }

    /// Wrap an event with metadata derived from its domain and level
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let meta = EventMeta::new(event.log_level(), event.event_source());
        Self { meta, event }
    }
}

pub type EventSender = UnboundedSender<EventMessage>;

pub type EventReceiver = UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout npmirror
///
/// Implemented by the raw `EventSender` and by every context struct that
/// carries one. Emission never fails: when the receiver is gone the event is
/// dropped.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            let _ = sender.send(EventMessage::from_event(event));
        }
    }

    /// Emit an event tagged with a correlation id (usually the run id)
    fn emit_correlated(&self, event: AppEvent, correlation_id: impl Into<String>) {
        if let Some(sender) = self.event_sender() {
            let meta = EventMeta::new(event.log_level(), event.event_source())
                .with_correlation_id(correlation_id);
            let _ = sender.send(EventMessage::new(meta, event));
        }
    }

    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

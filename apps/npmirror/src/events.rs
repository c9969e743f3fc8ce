//! Event handling and status display
//!
//! Progress events drive a single status line on stderr. Milestones, warnings
//! and failures are printed as permanent lines above it.

use console::{Style, Term};
use npmirror_events::{
    AppEvent, EventMessage, FetchEvent, GeneralEvent, ProgressEvent, RunEvent, ScheduleEvent,
};

/// How a printed line is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Info,
    Warning,
    Error,
    Debug,
}

/// Terminal rendering for one event
#[derive(Debug, Clone, PartialEq)]
pub enum Render {
    /// Replace the status line
    Status(String),
    /// Clear the status line
    ClearStatus,
    /// Print a permanent line
    Line(Tone, String),
    Nothing,
}

/// Event handler for status display and user feedback
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Structured output only; nothing is drawn
    quiet: bool,
    status_visible: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
            status_visible: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        crate::logging::log_event_with_tracing(&message);
        if self.quiet {
            return;
        }

        match render(&message.event, self.debug_enabled) {
            Render::Status(text) => self.show_status(&text),
            Render::ClearStatus => self.clear_status(),
            Render::Line(tone, text) => {
                self.clear_status();
                let styled = self.style(tone, &text);
                let _ = self.term.write_line(&styled);
            }
            Render::Nothing => {}
        }
    }

    /// Clear any pending status line before the process prints its result
    pub fn finish(&mut self) {
        self.clear_status();
    }

    fn show_status(&mut self, text: &str) {
        // Redrawing in place needs a terminal
        if !self.term.is_term() {
            return;
        }
        let width = usize::from(self.term.size().1).saturating_sub(1).max(10);
        let line = console::truncate_str(text, width, "...");
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&line);
        self.status_visible = true;
    }

    fn clear_status(&mut self) {
        if self.status_visible {
            let _ = self.term.clear_line();
            self.status_visible = false;
        }
    }

    fn style(&self, tone: Tone, text: &str) -> String {
        if !self.colors_enabled {
            return text.to_string();
        }
        let style = match tone {
            Tone::Success => Style::new().green(),
            Tone::Info => Style::new(),
            Tone::Warning => Style::new().yellow(),
            Tone::Error => Style::new().red().bold(),
            Tone::Debug => Style::new().dim(),
        };
        style.apply_to(text).to_string()
    }
}

/// Decide how `event` is drawn
pub fn render(event: &AppEvent, debug_enabled: bool) -> Render {
    match event {
        AppEvent::Progress(ProgressEvent::Shown { message, percent }) => {
            Render::Status(status_line(message, *percent))
        }
        AppEvent::Progress(ProgressEvent::Hidden) => Render::ClearStatus,

        AppEvent::Run(RunEvent::Milestone { message, .. }) => {
            Render::Line(Tone::Success, message.clone())
        }
        AppEvent::Run(RunEvent::LookupFailed {
            package, failure, ..
        }) => Render::Line(
            Tone::Warning,
            format!("Skipped {package}: {}", failure.message),
        ),
        AppEvent::Run(RunEvent::Failed { phase, failure, .. }) => {
            let mut text = format!("Run failed while {phase}: {}", failure.message);
            if let Some(hint) = &failure.hint {
                text.push_str(&format!("\n  Hint: {hint}"));
            }
            Render::Line(Tone::Error, text)
        }

        AppEvent::Fetch(FetchEvent::Failed { package, failure }) => Render::Line(
            Tone::Warning,
            format!("Failed to fetch {package}: {}", failure.message),
        ),

        AppEvent::Schedule(ScheduleEvent::Started { expression, .. }) => {
            Render::Line(Tone::Info, format!("Scheduler started ({expression})"))
        }
        AppEvent::Schedule(ScheduleEvent::NextTrigger { at }) => Render::Line(
            Tone::Info,
            format!("Next run at {}", at.format("%Y-%m-%d %H:%M:%S")),
        ),
        AppEvent::Schedule(ScheduleEvent::TriggerSkipped { scheduled_for }) => Render::Line(
            Tone::Warning,
            format!(
                "Skipped the {} run, the previous run was still active",
                scheduled_for.format("%Y-%m-%d %H:%M:%S")
            ),
        ),
        AppEvent::Schedule(ScheduleEvent::Stopped { runs }) => {
            Render::Line(Tone::Info, format!("Scheduler stopped after {runs} runs"))
        }

        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            let text = match context {
                Some(context) => format!("Warning: {message} ({context})"),
                None => format!("Warning: {message}"),
            };
            Render::Line(Tone::Warning, text)
        }
        AppEvent::General(GeneralEvent::Error { message, details }) => {
            let text = match details {
                Some(details) => format!("Error: {message}: {details}"),
                None => format!("Error: {message}"),
            };
            Render::Line(Tone::Error, text)
        }
        AppEvent::General(GeneralEvent::DebugLog { message, .. }) if debug_enabled => {
            Render::Line(Tone::Debug, message.clone())
        }

        // Logged but not drawn
        _ => Render::Nothing,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn status_line(message: &str, percent: f64) -> String {
    let percent = (percent.clamp(0.0, 1.0) * 100.0).round() as u32;
    format!("[{percent:>3}%] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use npmirror_events::FailureContext;
    use npmirror_types::{RunPhase, Uuid};

    #[test]
    fn test_progress_renders_percent() {
        let event = AppEvent::Progress(ProgressEvent::Shown {
            message: "Fetching: left-pad@1.3.0".to_string(),
            percent: 0.5,
        });
        assert_eq!(
            render(&event, false),
            Render::Status("[ 50%] Fetching: left-pad@1.3.0".to_string())
        );
    }

    #[test]
    fn test_run_failure_includes_hint() {
        let event = AppEvent::Run(RunEvent::Failed {
            run_id: Uuid::nil(),
            phase: RunPhase::Fetching,
            failure: FailureContext::new(
                Some("run.timed_out"),
                "run exceeded 60s",
                Some("Raise run.timeout_secs"),
                true,
            ),
        });
        match render(&event, false) {
            Render::Line(Tone::Error, text) => {
                assert!(text.starts_with("Run failed while fetching: run exceeded 60s"));
                assert!(text.ends_with("Hint: Raise run.timeout_secs"));
            }
            other => panic!("unexpected render {other:?}"),
        }
    }

    #[test]
    fn test_debug_lines_need_debug_mode() {
        let event = AppEvent::General(GeneralEvent::debug("packument cache hit"));
        assert_eq!(render(&event, false), Render::Nothing);
        assert!(matches!(render(&event, true), Render::Line(Tone::Debug, _)));
    }

    #[test]
    fn test_quiet_handler_accepts_events() {
        let mut handler = EventHandler::new(false, false, true);
        handler.handle_event(EventMessage::from_event(AppEvent::Progress(
            ProgressEvent::Hidden,
        )));
        handler.finish();
        assert!(!handler.status_visible);
    }
}

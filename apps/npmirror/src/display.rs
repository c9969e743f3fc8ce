//! Output rendering for command results

use console::{Style, Term};
use npmirror_types::{ColorChoice, RunDuration, RunReport, TrackedPackage};
use serde_json::json;
use std::io;

/// Result of a command, rendered after the event stream is drained
#[derive(Debug)]
pub enum CommandOutput {
    Run(RunReport),
    Daemon { runs: u64 },
    Tracked(Vec<TrackedPackage>),
    /// Names whose tracking state changed, and those already in that state
    TrackingChanged {
        action: &'static str,
        changed: Vec<String>,
        unchanged: Vec<String>,
    },
}

/// Output renderer for CLI results
pub struct OutputRenderer {
    json_output: bool,
    color_choice: ColorChoice,
    term: Term,
}

impl OutputRenderer {
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    pub fn render(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            let value = to_json(output).map_err(io::Error::other)?;
            self.term.write_line(&value.to_string())
        } else {
            for line in self.plain_lines(output) {
                self.term.write_line(&line)?;
            }
            Ok(())
        }
    }

    fn plain_lines(&self, output: &CommandOutput) -> Vec<String> {
        match output {
            CommandOutput::Run(report) => vec![
                format!("Archive: {}", self.bold(&report.archive_path.display().to_string())),
                format!(
                    "Packages: {} new, {} resolved, {} fetched ({} from cache), {} lookups failed",
                    report.new_packages,
                    report.resolved_dependencies,
                    report.fetch,
                    report.fetch.cached,
                    report.failed_lookups
                ),
                format!("Duration: {}", RunDuration(report.duration)),
            ],
            CommandOutput::Daemon { runs } => vec![format!("Completed {runs} scheduled runs")],
            CommandOutput::Tracked(records) if records.is_empty() => {
                vec!["No packages are tracked".to_string()]
            }
            CommandOutput::Tracked(records) => records
                .iter()
                .map(|record| {
                    let versions = if record.versions.is_empty() {
                        "(no versions mirrored yet)".to_string()
                    } else {
                        record.versions.iter().cloned().collect::<Vec<_>>().join(", ")
                    };
                    format!("{} {versions}", self.bold(&record.name))
                })
                .collect(),
            CommandOutput::TrackingChanged {
                action,
                changed,
                unchanged,
            } => {
                let mut lines: Vec<String> =
                    changed.iter().map(|name| format!("{action} {name}")).collect();
                lines.extend(unchanged.iter().map(|name| format!("{name}: nothing to do")));
                lines
            }
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn to_json(output: &CommandOutput) -> Result<serde_json::Value, serde_json::Error> {
    Ok(match output {
        CommandOutput::Run(report) => json!({ "run": serde_json::to_value(report)? }),
        CommandOutput::Daemon { runs } => json!({ "runs": runs }),
        CommandOutput::Tracked(records) => json!({ "tracked": serde_json::to_value(records)? }),
        CommandOutput::TrackingChanged {
            action,
            changed,
            unchanged,
        } => json!({ "action": action, "changed": changed, "unchanged": unchanged }),
    })
}

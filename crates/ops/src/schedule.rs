//! Cron-driven scheduling
//!
//! Runs execute inline in the scheduler loop, so at most one is active. The
//! next trigger is computed after a run finishes; any trigger that fell
//! inside the run is reported as skipped.

use crate::run::{RunCoordinator, RunOutcome};
use chrono::{DateTime, Local};
use cron::Schedule;
use npmirror_errors::Error;
use npmirror_events::{AppEvent, EventEmitter, EventSender, ScheduleEvent};
use std::time::Duration;
use tokio::sync::watch;

const MAX_NAP: Duration = Duration::from_secs(60 * 60);

pub struct Scheduler {
    coordinator: RunCoordinator,
    schedule: Schedule,
    run_on_start: bool,
    tx: EventSender,
}

impl Scheduler {
    #[must_use]
    pub fn new(coordinator: RunCoordinator, schedule: Schedule, run_on_start: bool) -> Self {
        let tx = coordinator.context().tx.clone();
        Self {
            coordinator,
            schedule,
            run_on_start,
            tx,
        }
    }

    /// Next trigger strictly after `after`
    #[must_use]
    pub fn next_after(&self, after: &DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(after).next()
    }

    /// Loop until `shutdown` turns true or the schedule has no more triggers
    ///
    /// Returns the number of runs executed.
    ///
    /// # Errors
    ///
    /// Currently infallible; run failures are settled by the coordinator.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<u64, Error> {
        self.emit(AppEvent::Schedule(ScheduleEvent::Started {
            expression: self.schedule.to_string(),
            run_on_start: self.run_on_start,
        }));

        let mut runs = 0u64;
        if self.run_on_start && !*shutdown.borrow() {
            let started = Local::now();
            let finished = self.trigger(started).await;
            self.report_skipped(&started, &finished);
            runs += 1;
        }

        let mut announced = None;
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Local::now();
            let Some(next) = self.next_after(&now) else {
                tracing::info!("schedule has no further triggers");
                break;
            };
            if announced != Some(next) {
                self.emit(AppEvent::Schedule(ScheduleEvent::NextTrigger { at: next }));
                announced = Some(next);
            }

            // Long waits are split so wall-clock jumps are noticed
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            let nap = wait.min(MAX_NAP);
            tokio::select! {
                () = tokio::time::sleep(nap) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if nap < wait {
                continue;
            }

            let finished = self.trigger(next).await;
            self.report_skipped(&next, &finished);
            runs += 1;
        }

        tracing::debug!(runs, "scheduler stopped");
        self.emit(AppEvent::Schedule(ScheduleEvent::Stopped { runs }));
        Ok(runs)
    }

    fn report_skipped(&self, started: &DateTime<Local>, finished: &DateTime<Local>) {
        for missed in triggers_between(&self.schedule, started, finished) {
            tracing::warn!(scheduled_for = %missed, "trigger skipped while a run was active");
            self.emit(AppEvent::Schedule(ScheduleEvent::TriggerSkipped {
                scheduled_for: missed,
            }));
        }
    }

    /// Run once for the trigger at `at`; returns when the run finished
    async fn trigger(&self, at: DateTime<Local>) -> DateTime<Local> {
        self.emit(AppEvent::Schedule(ScheduleEvent::Triggered { at }));
        if let RunOutcome::Failed(failure) = self.coordinator.run_guarded().await {
            tracing::debug!(run_id = %failure.run_id, "continuing after failed run");
        }
        Local::now()
    }
}

/// Triggers of `schedule` in `(since, until]`
#[must_use]
pub fn triggers_between(
    schedule: &Schedule,
    since: &DateTime<Local>,
    until: &DateTime<Local>,
) -> Vec<DateTime<Local>> {
    schedule.after(since).take_while(|at| at <= until).collect()
}

impl EventEmitter for Scheduler {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_default_expression_fires_daily_at_eight() {
        let schedule = Schedule::from_str("0 0 8 * * *").unwrap();
        let next = schedule.after(&at(9, 0, 0)).next().unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_triggers_inside_a_long_run_are_listed() {
        let schedule = Schedule::from_str("0 0/15 * * * *").unwrap();
        let missed = triggers_between(&schedule, &at(8, 0, 0), &at(8, 40, 0));
        assert_eq!(missed, vec![at(8, 15, 0), at(8, 30, 0)]);
    }

    #[test]
    fn test_short_run_skips_nothing() {
        let schedule = Schedule::from_str("0 0 8 * * *").unwrap();
        assert!(triggers_between(&schedule, &at(8, 0, 0), &at(8, 5, 0)).is_empty());
    }
}

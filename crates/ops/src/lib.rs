#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Mirror workflow orchestration for npmirror
//!
//! This crate sequences one mirror run (change detection, dependency
//! expansion, fetching, archiving) and drives it from a cron schedule.
//! Every collaborator is reached through [`MirrorCtx`].

mod context;
pub mod detect;
pub mod expand;
pub mod fetch;
pub mod run;
pub mod schedule;

pub use context::{MirrorContextBuilder, MirrorCtx};
pub use detect::{detect_changes, ChangeSet, LookupLimits};
pub use expand::expand;
pub use fetch::fetch_all;
pub use run::{RunCoordinator, RunFailure, RunOutcome};
pub use schedule::{triggers_between, Scheduler};

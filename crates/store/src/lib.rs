#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Persistent state for npmirror
//!
//! Three pieces live here: the `SQLite` record of tracked packages and
//! their mirrored versions, the shared tarball cache, and the archiver that
//! packs a run folder into `<folder>.tar`.

mod archive;
mod cache;
mod db;
mod tracked;

pub use archive::{Archiver, TarArchiver};
pub use cache::{copy_to, CacheWrite, PackageCache};
pub use db::{create_pool, run_migrations};
pub use tracked::{SqliteTrackedStore, TrackedStore};

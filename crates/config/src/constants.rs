//! Fixed names and defaults shared by the mirror crates

/// Directory name used under the platform cache and config directories
pub const APP_DIR: &str = "npmirror";

pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Daily at 08:00 local time, seconds-first
pub const DEFAULT_CRON: &str = "0 0 8 * * *";

/// Cached registry documents live under `<cache_dir>/_metadata`
pub const METADATA_DIR: &str = "_metadata";

/// Cached tarballs live under `<cache_dir>/packages`
pub const PACKAGES_DIR: &str = "packages";

pub const DB_FILE: &str = "tracked.sqlite";
pub const LOGS_DIR: &str = "logs";

pub const USER_AGENT: &str = concat!("npmirror/", env!("CARGO_PKG_VERSION"));

#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for npmirror
//!
//! This crate handles all HTTP traffic: registry document lookups with an
//! on-disk fallback cache and tarball downloads, both over a pooled client
//! with retry logic.

mod client;
mod registry;
mod source;

pub use client::{ensure_success, NetClient, NetConfig};
pub use registry::{encode_name, RegistryClient};
pub use source::{PackumentSource, TarballSource};

use npmirror_errors::{Error, NetworkError};
use url::Url;

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or invalid according to RFC 3986.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()).into())
}

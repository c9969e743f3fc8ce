//! Contracts for reading registry documents and tarballs

use async_trait::async_trait;
use npmirror_errors::{Error, RegistryError};
use npmirror_types::{PackageMetadata, Packument, ResolvedDependency};
use std::path::Path;

/// Source of registry documents
#[async_trait]
pub trait PackumentSource: Send + Sync {
    /// Full registry document for `name`
    async fn packument(&self, name: &str) -> Result<Packument, Error>;

    /// Current `latest` version of `name`
    async fn metadata(&self, name: &str) -> Result<PackageMetadata, Error> {
        let doc = self.packument(name).await?;
        let latest = doc.latest().ok_or_else(|| RegistryError::MissingLatest {
            name: name.to_string(),
        })?;
        Ok(PackageMetadata {
            name: name.to_string(),
            latest_version: latest.to_string(),
        })
    }
}

/// Source of package tarballs
#[async_trait]
pub trait TarballSource: Send + Sync {
    /// Write the tarball of `dependency` to `dest`, returning its size
    async fn download(&self, dependency: &ResolvedDependency, dest: &Path) -> Result<u64, Error>;
}

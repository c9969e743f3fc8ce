//! npm registry client with an on-disk document cache

use crate::client::{NetClient, NetConfig};
use crate::source::{PackumentSource, TarballSource};
use async_trait::async_trait;
use npmirror_config::Config;
use npmirror_errors::{Error, NetworkError, RegistryError};
use npmirror_events::{EventEmitter, EventSender};
use npmirror_types::{Packument, ResolvedDependency};
use std::path::{Path, PathBuf};
use url::Url;

/// Registry client serving both documents and tarballs
///
/// Every successfully fetched document is written to
/// `<metadata_dir>/<encoded-name>.json`. When the registry cannot be reached
/// the cached copy is served instead.
#[derive(Clone)]
pub struct RegistryClient {
    net: NetClient,
    base_url: Url,
    metadata_dir: PathBuf,
    tx: Option<EventSender>,
}

impl RegistryClient {
    /// Create a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidUrl` if `base_url` does not parse.
    pub fn new(
        net: NetClient,
        base_url: &str,
        metadata_dir: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let base_url = crate::parse_url(base_url)?;
        Ok(Self {
            net,
            base_url,
            metadata_dir: metadata_dir.into(),
            tx: None,
        })
    }

    /// Create a client from the `[registry]` and `[paths]` sections
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the registry
    /// URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let net = NetClient::new(NetConfig::from(&config.registry))?;
        Self::new(net, &config.registry.url, config.metadata_cache_dir())
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Document URL; scoped names keep the `@` and encode the slash
    #[must_use]
    pub fn packument_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            encode_name(name)
        )
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.metadata_dir.join(format!("{}.json", encode_name(name)))
    }

    async fn fetch_remote(&self, name: &str) -> Result<Packument, Error> {
        let url = self.packument_url(name);
        self.emit_debug(format!("GET {url}"));

        let body = self
            .net
            .get_bytes(&url)
            .await
            .map_err(|e| not_found_as_registry(e, name))?;

        let doc: Packument =
            serde_json::from_slice(&body).map_err(|e| RegistryError::InvalidDocument {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        if let Err(e) = self.write_cache(name, &body).await {
            self.emit_warning_with_context(
                format!("failed to cache registry document for {name}"),
                e.to_string(),
            );
        }
        Ok(doc)
    }

    async fn write_cache(&self, name: &str, body: &[u8]) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.metadata_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.metadata_dir))?;

        let path = self.cache_path(name);
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| Error::io_with_path(&e, &tmp))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::io_with_path(&e, &path));
        }
        Ok(())
    }

    async fn read_cache(&self, name: &str) -> Option<Packument> {
        let body = tokio::fs::read(self.cache_path(name)).await.ok()?;
        serde_json::from_slice(&body).ok()
    }
}

impl EventEmitter for RegistryClient {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

#[async_trait]
impl PackumentSource for RegistryClient {
    async fn packument(&self, name: &str) -> Result<Packument, Error> {
        match self.fetch_remote(name).await {
            Err(Error::Network(err)) => match self.read_cache(name).await {
                Some(doc) => {
                    tracing::warn!(
                        package = name,
                        error = %err,
                        "serving cached registry document"
                    );
                    self.emit_warning_with_context(
                        format!("registry unreachable, using cached metadata for {name}"),
                        err.to_string(),
                    );
                    Ok(doc)
                }
                None => Err(err.into()),
            },
            other => other,
        }
    }
}

#[async_trait]
impl TarballSource for RegistryClient {
    async fn download(&self, dependency: &ResolvedDependency, dest: &Path) -> Result<u64, Error> {
        self.emit_debug(format!("GET {}", dependency.tarball));
        self.net
            .download_to(&dependency.tarball, dest)
            .await
            .map_err(|e| not_found_as_registry(e, &dependency.cache_key()))
    }
}

/// Encode a package name for use as a registry path segment
#[must_use]
pub fn encode_name(name: &str) -> String {
    name.replace('/', "%2f")
}

fn not_found_as_registry(error: Error, name: &str) -> Error {
    match error {
        Error::Network(NetworkError::HttpError { status: 404, .. }) => RegistryError::NotFound {
            name: name.to_string(),
        }
        .into(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scoped_name() {
        assert_eq!(encode_name("@babel/core"), "@babel%2fcore");
        assert_eq!(encode_name("left-pad"), "left-pad");
    }

    #[test]
    fn test_packument_url_trims_slash() {
        let client = RegistryClient::new(
            NetClient::with_defaults().unwrap(),
            "https://registry.example.com/",
            "/tmp/meta",
        )
        .unwrap();
        assert_eq!(
            client.packument_url("@types/node"),
            "https://registry.example.com/@types%2fnode"
        );
        assert_eq!(
            client.cache_path("@types/node"),
            PathBuf::from("/tmp/meta/@types%2fnode.json")
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = RegistryClient::new(NetClient::with_defaults().unwrap(), "not a url", "/tmp");
        assert!(matches!(
            result,
            Err(Error::Network(NetworkError::InvalidUrl(_)))
        ));
    }
}

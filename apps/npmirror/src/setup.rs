//! Component initialization

use crate::error::CliError;
use npmirror_config::Config;
use npmirror_events::EventSender;
use npmirror_net::RegistryClient;
use npmirror_ops::{MirrorContextBuilder, MirrorCtx};
use npmirror_resolver::Resolver;
use npmirror_store::{PackageCache, SqliteTrackedStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Wires the production collaborators from configuration
pub struct MirrorSetup {
    config: Config,
}

impl MirrorSetup {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the cache and output directories
    pub async fn ensure_directories(&self) -> Result<(), CliError> {
        let required: [PathBuf; 3] = [
            self.config.metadata_cache_dir(),
            self.config.package_cache_dir(),
            self.config.output_dir(),
        ];
        for dir in &required {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    CliError::Setup(format!("Failed to create {}: {e}", dir.display()))
                })?;
            }
        }
        Ok(())
    }

    /// Open the tracked-record database, applying migrations
    pub async fn open_store(&self) -> Result<Arc<SqliteTrackedStore>, CliError> {
        let db_path = self.config.db_path();
        debug!("Opening tracked-record database at {}", db_path.display());
        Ok(Arc::new(SqliteTrackedStore::open(&db_path).await?))
    }

    /// Build the mirror context over the live registry
    pub async fn build_context(&self, tx: EventSender) -> Result<MirrorCtx, CliError> {
        self.ensure_directories().await?;
        let store = self.open_store().await?;

        let registry = Arc::new(RegistryClient::from_config(&self.config)?.with_events(tx.clone()));
        let resolver = Resolver::new(registry.clone(), self.config.concurrency.metadata_lookups)
            .with_events(tx.clone());
        let cache = PackageCache::new(self.config.package_cache_dir());

        info!(
            registry = %self.config.registry.url,
            cache = %self.config.cache_dir().display(),
            output = %self.config.output_dir().display(),
            "mirror components initialized"
        );

        let ctx = MirrorContextBuilder::new()
            .with_registry(registry.clone())
            .with_tarballs(registry)
            .with_resolver(Arc::new(resolver))
            .with_store(store)
            .with_cache(Arc::new(cache))
            .with_event_sender(tx)
            .with_config(self.config.clone())
            .build()?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandboxed(temp: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.paths.cache_dir = Some(temp.path().join("cache"));
        config.paths.output_dir = Some(temp.path().join("out"));
        config
    }

    #[tokio::test]
    async fn test_build_context_creates_layout() {
        let temp = tempfile::tempdir().unwrap();
        let setup = MirrorSetup::new(sandboxed(&temp));
        let (tx, _rx) = npmirror_events::channel();

        let ctx = setup.build_context(tx).await.unwrap();
        assert_eq!(ctx.cache.root(), setup.config().package_cache_dir().as_path());
        assert!(setup.config().metadata_cache_dir().is_dir());
        assert!(temp.path().join("out").is_dir());
        assert!(setup.config().db_path().is_file());
    }

    #[tokio::test]
    async fn test_store_opens_without_registry() {
        let temp = tempfile::tempdir().unwrap();
        let setup = MirrorSetup::new(sandboxed(&temp));
        let store = setup.open_store().await.unwrap();
        assert!(npmirror_store::TrackedStore::track(store.as_ref(), "left-pad")
            .await
            .unwrap());
    }
}

//! Mirror context for dependency injection

use npmirror_config::Config;
use npmirror_errors::{Error, RunError};
use npmirror_events::{EventEmitter, EventSender, ProgressHandle, ProgressReporter};
use npmirror_net::{PackumentSource, TarballSource};
use npmirror_resolver::DependencyResolver;
use npmirror_store::{Archiver, PackageCache, TarArchiver, TrackedStore};
use std::sync::Arc;

/// Everything a run needs, shared behind trait objects
pub struct MirrorCtx {
    /// Registry metadata
    pub registry: Arc<dyn PackumentSource>,
    /// Tarball downloads
    pub tarballs: Arc<dyn TarballSource>,
    /// Dependency closure resolution
    pub resolver: Arc<dyn DependencyResolver>,
    /// Tracked packages and mirrored versions
    pub store: Arc<dyn TrackedStore>,
    /// Shared tarball cache
    pub cache: Arc<PackageCache>,
    pub archiver: Arc<dyn Archiver>,
    /// Stage progress observer
    pub progress: Arc<dyn ProgressReporter>,
    /// Event sender for milestones and failures
    pub tx: EventSender,
    pub config: Config,
}

impl EventEmitter for MirrorCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

/// Builder for [`MirrorCtx`]
///
/// The cache, archiver and progress reporter fall back to the production
/// implementations derived from the configuration and event sender.
#[derive(Default)]
pub struct MirrorContextBuilder {
    registry: Option<Arc<dyn PackumentSource>>,
    tarballs: Option<Arc<dyn TarballSource>>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    store: Option<Arc<dyn TrackedStore>>,
    cache: Option<Arc<PackageCache>>,
    archiver: Option<Arc<dyn Archiver>>,
    progress: Option<Arc<dyn ProgressReporter>>,
    tx: Option<EventSender>,
    config: Option<Config>,
}

impl MirrorContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn PackumentSource>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_tarballs(mut self, tarballs: Arc<dyn TarballSource>) -> Self {
        self.tarballs = Some(tarballs);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TrackedStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<PackageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if any required component is missing.
    pub fn build(self) -> Result<MirrorCtx, Error> {
        let registry = self.registry.ok_or_else(|| missing("registry"))?;
        let tarballs = self.tarballs.ok_or_else(|| missing("tarballs"))?;
        let resolver = self.resolver.ok_or_else(|| missing("resolver"))?;
        let store = self.store.ok_or_else(|| missing("store"))?;
        let tx = self.tx.ok_or_else(|| missing("event_sender"))?;
        let config = self.config.ok_or_else(|| missing("config"))?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(PackageCache::new(config.package_cache_dir())));
        let archiver = self
            .archiver
            .unwrap_or_else(|| Arc::new(TarArchiver::new()));
        let progress = self
            .progress
            .unwrap_or_else(|| Arc::new(ProgressHandle::new(tx.clone())));

        Ok(MirrorCtx {
            registry,
            tarballs,
            resolver,
            store,
            cache,
            archiver,
            progress,
            tx,
            config,
        })
    }
}

fn missing(component: &str) -> Error {
    RunError::MissingComponent {
        component: component.to_string(),
    }
    .into()
}

//! In-memory collaborators shared by the ops tests

#![allow(dead_code)]

use async_trait::async_trait;
use npmirror_config::Config;
use npmirror_errors::{Error, NetworkError, RegistryError, RunError};
use npmirror_events::{EventReceiver, ProgressReporter};
use npmirror_net::{PackumentSource, TarballSource};
use npmirror_ops::{MirrorContextBuilder, MirrorCtx};
use npmirror_resolver::Resolver;
use npmirror_store::{Archiver, PackageCache, TrackedStore};
use npmirror_types::{Dist, Packument, ResolvedDependency, TrackedPackage, VersionManifest};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
pub struct FakeRegistry {
    docs: HashMap<String, Packument>,
    offline: HashSet<String>,
    broken_tarballs: HashSet<String>,
    delay: Option<Duration>,
    pub downloads: AtomicUsize,
}

impl FakeRegistry {
    pub fn publish(&mut self, name: &str, version: &str, deps: &[(&str, &str)]) {
        let doc = self.docs.entry(name.to_string()).or_insert_with(|| Packument {
            name: name.to_string(),
            dist_tags: BTreeMap::new(),
            versions: BTreeMap::new(),
        });
        doc.dist_tags.insert("latest".to_string(), version.to_string());
        doc.versions.insert(
            version.to_string(),
            VersionManifest {
                name: name.to_string(),
                version: version.to_string(),
                dependencies: deps
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                optional_dependencies: BTreeMap::new(),
                dist: Dist {
                    tarball: format!("https://registry.test/{name}/-/{name}-{version}.tgz"),
                    shasum: None,
                    integrity: None,
                },
            },
        );
    }

    /// Lookups of `name` fail with a network error
    pub fn take_offline(&mut self, name: &str) {
        self.offline.insert(name.to_string());
    }

    /// Every lookup waits `delay` before answering
    pub fn slow_down(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    /// Downloads of `name@version` fail
    pub fn break_tarball(&mut self, key: &str) {
        self.broken_tarballs.insert(key.to_string());
    }
}

#[async_trait]
impl PackumentSource for FakeRegistry {
    async fn packument(&self, name: &str) -> Result<Packument, Error> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.contains(name) {
            return Err(NetworkError::ConnectionRefused(format!("registry.test/{name}")).into());
        }
        self.docs.get(name).cloned().ok_or_else(|| {
            RegistryError::NotFound {
                name: name.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl TarballSource for FakeRegistry {
    async fn download(&self, dependency: &ResolvedDependency, dest: &Path) -> Result<u64, Error> {
        if self.broken_tarballs.contains(&dependency.cache_key()) {
            return Err(NetworkError::HttpError {
                status: 500,
                message: "internal server error".to_string(),
            }
            .into());
        }
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let body = dependency.cache_key().into_bytes();
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, BTreeSet<String>>>,
}

impl MemoryStore {
    pub fn tracking(self, name: &str, versions: &[&str]) -> Self {
        self.records.lock().unwrap().insert(
            name.to_string(),
            versions.iter().map(|v| (*v).to_string()).collect(),
        );
        self
    }

    pub fn versions(&self, name: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .get(name)
            .map(|v| v.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TrackedStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<TrackedPackage>, Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|(name, versions)| TrackedPackage::with_versions(name.clone(), versions.clone()))
            .collect())
    }

    async fn record_version(&self, name: &str, version: &str) -> Result<(), Error> {
        self.records
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string());
        Ok(())
    }

    async fn track(&self, name: &str) -> Result<bool, Error> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(name) {
            return Ok(false);
        }
        records.insert(name.to_string(), BTreeSet::new());
        Ok(true)
    }

    async fn untrack(&self, name: &str) -> Result<bool, Error> {
        Ok(self.records.lock().unwrap().remove(name).is_some())
    }
}

pub struct FailingArchiver;

#[async_trait]
impl Archiver for FailingArchiver {
    async fn archive(&self, dest_folder: &Path) -> Result<PathBuf, Error> {
        Err(RunError::ArchiveFailed {
            path: dest_folder.display().to_string(),
            message: "no space left on device".to_string(),
        }
        .into())
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub shown: Mutex<Vec<(String, f64)>>,
    pub hidden: AtomicUsize,
}

impl ProgressReporter for RecordingProgress {
    fn show(&self, message: &str, percent: f64) {
        self.shown.lock().unwrap().push((message.to_string(), percent));
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub registry: Arc<FakeRegistry>,
    pub store: Arc<MemoryStore>,
    pub progress: Arc<RecordingProgress>,
    pub rx: EventReceiver,
}

impl Harness {
    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("out")
    }

    /// Entries currently in the output directory
    pub fn outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output_dir())
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn drain_events(&mut self) -> Vec<npmirror_events::AppEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            events.push(message.event);
        }
        events
    }
}

pub fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.cache_dir = Some(temp.path().join("cache"));
    config.paths.output_dir = Some(temp.path().join("out"));
    config
}

/// Build a context over the fakes
pub fn context(registry: FakeRegistry, store: MemoryStore) -> (Arc<MirrorCtx>, Harness) {
    context_with(registry, store, None, |_| {})
}

/// Build a context over the fakes, optionally swapping the archiver and
/// adjusting the configuration
pub fn context_with<F>(
    registry: FakeRegistry,
    store: MemoryStore,
    archiver: Option<Arc<dyn Archiver>>,
    configure: F,
) -> (Arc<MirrorCtx>, Harness)
where
    F: FnOnce(&mut Config),
{
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    configure(&mut config);
    let registry = Arc::new(registry);
    let store = Arc::new(store);
    let progress = Arc::new(RecordingProgress::default());
    let (tx, rx) = npmirror_events::channel();

    let resolver = Resolver::new(registry.clone(), config.concurrency.metadata_lookups)
        .with_events(tx.clone());
    let mut builder = MirrorContextBuilder::new()
        .with_registry(registry.clone())
        .with_tarballs(registry.clone())
        .with_resolver(Arc::new(resolver))
        .with_store(store.clone())
        .with_cache(Arc::new(PackageCache::new(config.package_cache_dir())))
        .with_progress(progress.clone())
        .with_event_sender(tx)
        .with_config(config);
    if let Some(archiver) = archiver {
        builder = builder.with_archiver(archiver);
    }
    let ctx = Arc::new(builder.build().unwrap());

    let harness = Harness {
        temp,
        registry,
        store,
        progress,
        rx,
    };
    (ctx, harness)
}

pub fn tar_files(archive: &Path) -> Vec<String> {
    let file = std::fs::File::open(archive).unwrap();
    let mut reader = tar::Archive::new(file);
    reader
        .entries()
        .unwrap()
        .map(Result::unwrap)
        .filter(|e| e.header().entry_type().is_file())
        .map(|e| e.path().unwrap().display().to_string())
        .collect()
}

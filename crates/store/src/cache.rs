//! Shared package tarball cache
//!
//! Entries live under `<root>/<name>/-/<basename>-<version>.tgz`, the same
//! layout as a run's destination folder. Writes for one `name@version` are
//! serialized; reads never lock.

use dashmap::DashMap;
use npmirror_errors::{Error, StorageError};
use npmirror_types::ResolvedDependency;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of a cache write attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWrite {
    pub path: PathBuf,
    /// False when another writer stored the entry while we waited
    pub fresh: bool,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct PackageCache {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PackageCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn entry_path(&self, dep: &ResolvedDependency) -> PathBuf {
        self.root.join(dep.relative_path())
    }

    /// Path of the cached tarball, if present
    pub async fn lookup(&self, dep: &ResolvedDependency) -> Option<PathBuf> {
        let path = self.entry_path(dep);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Store an entry by letting `write` fill a temporary file
    ///
    /// The temporary file is renamed into place only when `write` succeeds,
    /// and removed otherwise. If the entry appeared while waiting for the
    /// key lock, `write` is not called.
    ///
    /// # Errors
    ///
    /// Returns the writer's error, or a storage error if the entry cannot be
    /// moved into place.
    pub async fn store_with<F, Fut>(
        &self,
        dep: &ResolvedDependency,
        write: F,
    ) -> Result<CacheWrite, Error>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<u64, Error>>,
    {
        self.locked_write(dep, write, true).await
    }

    /// Like [`Self::store_with`] but always rewrites an existing entry
    ///
    /// # Errors
    ///
    /// Same as [`Self::store_with`].
    pub async fn refresh_with<F, Fut>(
        &self,
        dep: &ResolvedDependency,
        write: F,
    ) -> Result<CacheWrite, Error>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<u64, Error>>,
    {
        self.locked_write(dep, write, false).await
    }

    async fn locked_write<F, Fut>(
        &self,
        dep: &ResolvedDependency,
        write: F,
        reuse: bool,
    ) -> Result<CacheWrite, Error>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<u64, Error>>,
    {
        let key = dep.cache_key();
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock().await;

        let result = self.write_locked(dep, write, reuse).await;

        drop(guard);
        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn write_locked<F, Fut>(
        &self,
        dep: &ResolvedDependency,
        write: F,
        reuse: bool,
    ) -> Result<CacheWrite, Error>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<u64, Error>>,
    {
        let path = self.entry_path(dep);
        if let Ok(meta) = tokio::fs::metadata(&path).await {
            if reuse && meta.is_file() {
                return Ok(CacheWrite {
                    path,
                    fresh: false,
                    bytes: meta.len(),
                });
            }
        }

        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath {
                path: path.display().to_string(),
            })?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| Error::io_with_path(&e, &parent))?;

        let tmp = parent.join(format!(
            ".{}.{}.tmp",
            dep.tarball_file_name(),
            uuid::Uuid::new_v4()
        ));

        let bytes = match write(tmp.clone()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::AtomicRenameFailed {
                message: format!("{} -> {}: {e}", tmp.display(), path.display()),
            }
            .into());
        }

        tracing::debug!(package = %dep, path = %path.display(), bytes, "cached tarball");
        Ok(CacheWrite {
            path,
            fresh: true,
            bytes,
        })
    }

    /// Number of keys currently holding a write lock entry
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.locks.len()
    }
}

/// Copy a cached tarball into a destination path, creating parent folders
///
/// # Errors
///
/// Returns an I/O error carrying the failing path.
pub async fn copy_to(src: &Path, dest: &Path) -> Result<u64, Error> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    tokio::fs::copy(src, dest)
        .await
        .map_err(|e| Error::io_with_path(&e, dest))
}

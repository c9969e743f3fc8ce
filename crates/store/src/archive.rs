//! Run folder archiving (.tar)

use async_trait::async_trait;
use npmirror_errors::{Error, RunError, StorageError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Packs a finished run folder into a single file
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive `dest_folder` and return the archive path
    ///
    /// The folder itself is left in place. Dropping the future before it
    /// resolves must not leave an archive behind.
    async fn archive(&self, dest_folder: &Path) -> Result<PathBuf, Error>;
}

/// Plain tar archiver writing `<dest_folder>.tar`
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiver;

impl TarArchiver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn archive_path(dest_folder: &Path) -> PathBuf {
        let mut name = dest_folder.as_os_str().to_owned();
        name.push(".tar");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Archiver for TarArchiver {
    async fn archive(&self, dest_folder: &Path) -> Result<PathBuf, Error> {
        let src = dest_folder.to_path_buf();
        let target = Self::archive_path(dest_folder);
        let mut partial = target.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        // The blocking task outlives a timed-out run, so it checks this
        // before publishing the archive
        let guard = AbandonOnDrop(Arc::new(AtomicBool::new(false)));
        let abandoned = Arc::clone(&guard.0);
        let task_target = target.clone();
        let written = tokio::task::spawn_blocking(move || {
            write_archive(&src, &partial, &task_target, &abandoned)
        })
        .await
        .map_err(|e| Error::internal(format!("archive task failed: {e}")))?;
        drop(guard);

        written.map_err(|e| {
            Error::from(RunError::ArchiveFailed {
                path: target.display().to_string(),
                message: e.to_string(),
            })
        })?;

        tracing::debug!(archive = %target.display(), "archive written");
        Ok(target)
    }
}

/// Flags the archive as abandoned when the awaiting future goes away
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Write `src` to `partial`, then rename it to `target` unless abandoned
///
/// The partial file never survives a failure or an abandoned archive.
fn write_archive(
    src: &Path,
    partial: &Path,
    target: &Path,
    abandoned: &AtomicBool,
) -> Result<(), Error> {
    let result = write_tar(src, partial).and_then(|()| {
        if abandoned.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        std::fs::rename(partial, target).map_err(|e| {
            Error::from(StorageError::AtomicRenameFailed {
                message: format!("{} -> {}: {e}", partial.display(), target.display()),
            })
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(partial);
    }
    result
}

/// Write the tree under `src` to `out`, entries prefixed by the folder name
fn write_tar(src: &Path, out: &Path) -> Result<(), Error> {
    let meta = std::fs::metadata(src).map_err(|e| StorageError::from_io_with_path(&e, src))?;
    if !meta.is_dir() {
        return Err(StorageError::PathNotFound {
            path: src.display().to_string(),
        }
        .into());
    }
    let prefix = src
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| StorageError::InvalidPath {
            path: src.display().to_string(),
        })?;

    let file = File::create(out).map_err(|e| Error::io_with_path(&e, out))?;
    let mut builder = tar::Builder::new(BufWriter::new(file));
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| StorageError::IoError {
            message: e.to_string(),
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|_| StorageError::InvalidPath {
            path: entry.path().display().to_string(),
        })?;
        let name = prefix.join(relative);

        if entry.file_type().is_dir() {
            builder
                .append_dir(&name, entry.path())
                .map_err(|e| Error::io_with_path(&e, entry.path()))?;
        } else {
            builder
                .append_path_with_name(entry.path(), &name)
                .map_err(|e| Error::io_with_path(&e, entry.path()))?;
        }
    }

    let mut writer = builder
        .into_inner()
        .map_err(|e| Error::io_with_path(&e, out))?;
    writer.flush().map_err(|e| Error::io_with_path(&e, out))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| Error::io_with_path(&e, out))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path_appends_extension() {
        let path = TarArchiver::archive_path(Path::new("/srv/mirror/10142026.080000"));
        assert_eq!(path, PathBuf::from("/srv/mirror/10142026.080000.tar"));
    }

    #[test]
    fn test_abandoned_archive_is_not_published() {
        let dir = tempfile::TempDir::new().unwrap();
        let folder = dir.path().join("10142026.080000");
        std::fs::create_dir_all(folder.join("ms/-")).unwrap();
        std::fs::write(folder.join("ms/-/ms-2.1.3.tgz"), b"ms").unwrap();
        let target = TarArchiver::archive_path(&folder);
        let partial = dir.path().join("10142026.080000.tar.partial");

        let err = write_archive(&folder, &partial, &target, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!target.exists());
        assert!(!partial.exists());

        write_archive(&folder, &partial, &target, &AtomicBool::new(false)).unwrap();
        assert!(target.is_file());
        assert!(!partial.exists());
    }

    #[test]
    fn test_drop_guard_marks_abandoned() {
        let flag = Arc::new(AtomicBool::new(false));
        drop(AbandonOnDrop(Arc::clone(&flag)));
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_folder_fails_without_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        let folder = dir.path().join("10142026.080000");

        let err = TarArchiver::new().archive(&folder).await.unwrap_err();
        assert!(matches!(err, Error::Run(RunError::ArchiveFailed { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

use crate::errors::CoreError;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem abstraction boundary for the trash store.
///
/// Keeping this trait narrow makes it easy to write deterministic tests (the
/// clock in particular) without touching the real wall-clock time.
pub trait FileSystem: Send + Sync {
    /// Returns the current time in wall-clock format.
    fn now(&self) -> SystemTime;

    /// Returns true when path exists, without following a trailing symlink.
    fn exists(&self, path: &Path) -> bool {
        self.symlink_metadata(path).is_ok()
    }

    /// Reads symlink metadata.
    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Renames/moves a path. Never falls back to copying.
    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Like `rename`, but fails with `DestinationExists` instead of
    /// replacing anything that appears at `to`.
    fn rename_noreplace(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Lists directory children as concrete paths.
    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>>;

    /// Removes a file or symlink.
    fn remove_file(&self, path: &Path) -> crate::Result<()>;

    /// Removes a directory tree.
    fn remove_dir_all(&self, path: &Path) -> crate::Result<()>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::symlink_metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()> {
        fs::rename(from, to).map_err(|err| CoreError::io(from, err))
    }

    /// Claims `to` first (a hard link for files, an empty directory for
    /// directories) so a concurrent creator makes the claim fail instead of
    /// being overwritten. Filesystems without hard links fall back to a
    /// checked rename.
    fn rename_noreplace(&self, from: &Path, to: &Path) -> crate::Result<()> {
        let is_dir = self.symlink_metadata(from)?.is_dir();
        let claimed = if is_dir {
            fs::create_dir(to)
        } else {
            fs::hard_link(from, to)
        };
        match claimed {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(CoreError::DestinationExists(to.to_path_buf()));
            }
            Err(err)
                if !is_dir
                    && matches!(
                        err.kind(),
                        io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
                    ) =>
            {
                if self.exists(to) {
                    return Err(CoreError::DestinationExists(to.to_path_buf()));
                }
                return self.rename(from, to);
            }
            Err(err) => return Err(CoreError::io(to, err)),
        }

        // Only our own claim lives at `to` now.
        let finished = if is_dir {
            fs::rename(from, to)
        } else {
            fs::remove_file(from)
        };
        finished.map_err(|err| {
            let _ = if is_dir {
                fs::remove_dir(to)
            } else {
                fs::remove_file(to)
            };
            CoreError::io(from, err)
        })
    }

    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .map_err(|err| CoreError::io(path, err))?
            .map(|entry| entry.map(|v| v.path()))
            .collect::<Result<Vec<PathBuf>, io::Error>>()
            .map_err(|err| CoreError::io(path, err))
    }

    fn remove_file(&self, path: &Path) -> crate::Result<()> {
        fs::remove_file(path).map_err(|err| CoreError::io(path, err))
    }

    fn remove_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::remove_dir_all(path).map_err(|err| CoreError::io(path, err))
    }
}

/// Removes whatever lives at `path`: a directory tree, a file or a symlink.
pub fn remove_any<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> crate::Result<()> {
    let metadata = fs.symlink_metadata(path)?;
    if metadata.is_dir() {
        fs.remove_dir_all(path)
    } else {
        fs.remove_file(path)
    }
}

/// Recursive byte total below `path`. Symlinks count their own length and
/// are never followed.
pub fn disk_usage(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| !metadata.is_dir())
        .map(|metadata| metadata.len())
        .sum()
}

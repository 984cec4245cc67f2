//! Advisory lock serializing writers of the trash store and its log.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::errors::{CoreError, Result};

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// RAII guard holding an exclusive lock; released on drop.
///
/// The lock file itself is left in place so that a waiting process never
/// ends up locking an unlinked inode.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Polls for an exclusive lock on `path` until `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|err| CoreError::io(path, err))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(lock = %path.display(), "acquired store lock");
                    return Ok(Self { file });
                }
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                    if started.elapsed() >= timeout {
                        warn!(lock = %path.display(), "gave up waiting for store lock");
                        return Err(CoreError::LockTimeout {
                            path: path.to_path_buf(),
                            waited_secs: timeout.as_secs(),
                        });
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(CoreError::io(path, err)),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = <File as FileExt>::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".deletion-log.lock");

        let held = StoreLock::acquire(&path, Duration::from_secs(1)).unwrap();
        let err = StoreLock::acquire(&path, Duration::from_millis(120)).unwrap_err();
        assert!(matches!(err, CoreError::LockTimeout { .. }));

        drop(held);
        assert!(StoreLock::acquire(&path, Duration::from_millis(120)).is_ok());
    }
}

//! Durable holding area for trashed items, joined with the deletion log.
//!
//! The store is pure storage: it moves objects in and out of the trash root
//! and keeps the log in step. Policy (what may be deleted, confirmation,
//! retention) lives in the engines built on top of it.

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::SafeRmConfig;
use crate::deletion_log::{DeletionLog, DeletionLogRecord};
use crate::errors::{CoreError, Result};
use crate::fs::{disk_usage, remove_any, FileSystem, RealFileSystem};
use crate::helpers::{
    build_unique_basename, parse_trash_id_time, sanitize_basename, serialize_system_time,
    trash_id_prefix,
};
use crate::lock::StoreLock;
use crate::models::{EntryKind, TrashEntry, TrashId};

const MAX_COLLISION_SUFFIX: u64 = 10_000;

#[derive(Debug)]
pub struct TrashStore<F: FileSystem = RealFileSystem> {
    fs: F,
    root: PathBuf,
    log: DeletionLog,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl TrashStore<RealFileSystem> {
    pub fn new(config: &SafeRmConfig) -> Self {
        Self::with_fs(config, RealFileSystem)
    }
}

impl<F: FileSystem> TrashStore<F> {
    pub fn with_fs(config: &SafeRmConfig, fs: F) -> Self {
        Self {
            fs,
            root: config.trash_root.clone(),
            log: DeletionLog::new(config.log_path()),
            lock_path: config.lock_path(),
            lock_timeout: config.lock_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log(&self) -> &DeletionLog {
        &self.log
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Takes the exclusive writer lock, creating the trash root if needed.
    pub fn lock(&self) -> Result<StoreWriter<'_, F>> {
        self.fs.create_dir_all(&self.root)?;
        let guard = StoreLock::acquire(&self.lock_path, self.lock_timeout)?;
        Ok(StoreWriter {
            store: self,
            _guard: guard,
        })
    }

    /// Moves `original_path` into the trash under a fresh id.
    pub fn put(&self, original_path: &Path) -> Result<TrashEntry> {
        self.lock()?.put(original_path)
    }

    /// Permanently deletes a stored object and its log record.
    pub fn remove(&self, trash_id: &TrashId) -> Result<()> {
        self.lock()?.remove(trash_id)
    }

    /// Every entry currently in storage, ordered by trash id (which is also
    /// chronological). Entries that vanish mid-scan are skipped.
    pub fn list(&self) -> Result<Vec<TrashEntry>> {
        if !self.fs.exists(&self.root) {
            return Ok(Vec::new());
        }

        let records: HashMap<String, DeletionLogRecord> = self
            .log
            .records()?
            .into_iter()
            .rev()
            .map(|record| (record.trash_id.clone(), record))
            .collect();

        let mut entries = Vec::new();
        for path in self.fs.list_dir(&self.root)? {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Ok(trash_id) = TrashId::parse(name) else {
                continue;
            };
            let Ok(metadata) = self.fs.symlink_metadata(&path) else {
                debug!(trash_id = %trash_id, "entry vanished during listing");
                continue;
            };
            let record = records.get(trash_id.as_str());
            entries.push(self.entry_from(trash_id, path, &metadata, record));
        }
        entries.sort_by(|a, b| a.trash_id.cmp(&b.trash_id));
        Ok(entries)
    }

    /// Looks up one entry; storage decides existence, the log supplies origin.
    pub fn get(&self, trash_id: &TrashId) -> Result<TrashEntry> {
        let stored = self.root.join(trash_id.as_str());
        let metadata = self
            .fs
            .symlink_metadata(&stored)
            .map_err(|_| CoreError::not_found(format!("no trash entry {trash_id}")))?;
        let record = self.log.find(trash_id.as_str())?;
        Ok(self.entry_from(trash_id.clone(), stored, &metadata, record.as_ref()))
    }

    fn entry_from(
        &self,
        trash_id: TrashId,
        stored_path: PathBuf,
        metadata: &Metadata,
        record: Option<&DeletionLogRecord>,
    ) -> TrashEntry {
        let deleted_at = record
            .and_then(DeletionLogRecord::deleted_at)
            .or_else(|| parse_trash_id_time(trash_id.as_str()))
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_else(|| DateTime::<Utc>::from(self.fs.now()));
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let size_bytes = match kind {
            EntryKind::Directory => disk_usage(&stored_path),
            EntryKind::File => metadata.len(),
        };
        TrashEntry {
            trash_id,
            original_path: record.map(|record| record.original_path.clone()),
            stored_path,
            kind,
            deleted_at,
            size_bytes,
        }
    }

    fn mint_id(&self, original_path: &Path) -> Result<TrashId> {
        let prefix = trash_id_prefix(self.fs.now());
        let base = sanitize_basename(original_path);
        for suffix in 0..MAX_COLLISION_SUFFIX {
            let name = if suffix == 0 {
                format!("{prefix}_{base}")
            } else {
                format!("{prefix}_{}", build_unique_basename(&base, suffix))
            };
            if !self.fs.exists(&self.root.join(&name)) {
                return TrashId::parse(&name);
            }
        }
        Err(CoreError::conflict(format!(
            "no free trash id for {} within {MAX_COLLISION_SUFFIX} attempts",
            original_path.display()
        )))
    }
}

/// Rejects paths the deletion log cannot represent: non-UTF-8 paths and
/// paths containing a newline.
pub fn check_recordable(path: &Path) -> Result<()> {
    let Some(text) = path.to_str() else {
        return Err(CoreError::InvalidPath(format!(
            "{}: path is not valid UTF-8",
            path.display()
        )));
    };
    if text.contains('\n') {
        return Err(CoreError::InvalidPath(format!(
            "{}: newlines in paths cannot be recorded",
            path.display()
        )));
    }
    Ok(())
}

/// Mutating access to the store, alive only while the lock is held.
pub struct StoreWriter<'a, F: FileSystem> {
    store: &'a TrashStore<F>,
    _guard: StoreLock,
}

impl<'a, F: FileSystem> StoreWriter<'a, F> {
    /// Moves the object into the trash, then records it. If the record
    /// cannot be written the move is undone so nothing is left half-trashed.
    pub fn put(&self, original_path: &Path) -> Result<TrashEntry> {
        let store = self.store;
        store
            .fs
            .symlink_metadata(original_path)
            .map_err(|_| CoreError::not_found(original_path.display().to_string()))?;
        check_recordable(original_path)?;

        let trash_id = store.mint_id(original_path)?;
        let stored_path = store.root.join(trash_id.as_str());
        store
            .fs
            .rename(original_path, &stored_path)
            .map_err(|err| CoreError::deletion_failed(original_path, err))?;

        let record = DeletionLogRecord {
            timestamp: serialize_system_time(store.fs.now()),
            original_path: original_path.to_path_buf(),
            trash_id: trash_id.to_string(),
        };
        if let Err(err) = store.log.append(&record) {
            if let Err(rollback) = store.fs.rename(&stored_path, original_path) {
                warn!(
                    trash_id = %trash_id,
                    error = %rollback,
                    "could not roll back move after log failure"
                );
            }
            return Err(CoreError::deletion_failed(original_path, err));
        }

        info!(trash_id = %trash_id, original = %original_path.display(), "moved to trash");
        store.get(&trash_id)
    }

    pub fn remove(&self, trash_id: &TrashId) -> Result<()> {
        let entry = self.store.get(trash_id)?;
        remove_any(&self.store.fs, &entry.stored_path)?;
        self.store.log.remove(trash_id.as_str())?;
        info!(trash_id = %trash_id, "permanently removed from trash");
        Ok(())
    }

    /// Moves a stored object to `destination` and drops its record once the
    /// move has succeeded. Refuses to overwrite anything.
    pub fn move_out(&self, entry: &TrashEntry, destination: &Path) -> Result<()> {
        let fs = &self.store.fs;
        if fs.exists(destination) {
            return Err(CoreError::DestinationExists(destination.to_path_buf()));
        }
        if let Some(parent) = destination.parent() {
            fs.create_dir_all(parent)?;
        }
        fs.rename_noreplace(&entry.stored_path, destination)?;
        if let Err(err) = self.store.log.remove(entry.trash_id.as_str()) {
            warn!(
                trash_id = %entry.trash_id,
                error = %err,
                "restored but could not drop log record"
            );
        }
        info!(
            trash_id = %entry.trash_id,
            destination = %destination.display(),
            "moved out of trash"
        );
        Ok(())
    }
}

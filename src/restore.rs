//! Restore and read-only queries over the trash store.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SafeRmContext;
use crate::errors::{CoreError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::helpers::{format_duration, print_size};
use crate::models::{TrashEntry, TrashId, TrashInfo};
use crate::store::TrashStore;

/// Outcome of a successful restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub trash_id: TrashId,
    pub restored_to: PathBuf,
}

impl fmt::Display for Restored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Restored: {} -> {}", self.trash_id, self.restored_to.display())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Whether the first `rm` on `PATH` is the safe-deletion binary.
    pub installed: bool,
    pub rm_resolves_to: Option<PathBuf>,
    pub safe_rm_binary: PathBuf,
    pub binary_present: bool,
    pub trash_root: PathBuf,
    pub log_path: PathBuf,
    pub entry_count: usize,
    pub total_size_bytes: u64,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.installed { "ACTIVE" } else { "NOT ACTIVE" };
        writeln!(f, "safe-rm status: {state}")?;
        match &self.rm_resolves_to {
            Some(path) => writeln!(f, "  rm resolves to: {}", path.display())?,
            None => writeln!(f, "  rm resolves to: (not found on PATH)")?,
        }
        writeln!(
            f,
            "  safe-rm binary: {}{}",
            self.safe_rm_binary.display(),
            if self.binary_present { "" } else { " (missing)" }
        )?;
        writeln!(f, "  trash root: {}", self.trash_root.display())?;
        writeln!(f, "  deletion log: {}", self.log_path.display())?;
        write!(
            f,
            "  items in trash: {} ({})",
            self.entry_count,
            print_size(self.total_size_bytes)
        )
    }
}

pub struct RestoreEngine<'a, F: FileSystem = RealFileSystem> {
    ctx: &'a SafeRmContext,
    store: &'a TrashStore<F>,
}

impl<'a, F: FileSystem> RestoreEngine<'a, F> {
    pub fn new(ctx: &'a SafeRmContext, store: &'a TrashStore<F>) -> Self {
        Self { ctx, store }
    }

    /// Moves an entry back to its recorded original path. Never guesses a
    /// destination and never overwrites.
    pub fn restore(&self, trash_id: &TrashId) -> Result<Restored> {
        let writer = self.store.lock()?;
        let entry = self.store.get(trash_id)?;
        let destination = entry
            .original_path
            .clone()
            .ok_or_else(|| CoreError::DegradedRestore(trash_id.to_string()))?;
        writer.move_out(&entry, &destination)?;
        info!(trash_id = %trash_id, "restored");
        Ok(Restored {
            trash_id: trash_id.clone(),
            restored_to: destination,
        })
    }

    pub fn info(&self, trash_id: &TrashId) -> Result<TrashInfo> {
        Ok(self.store.get(trash_id)?.info())
    }

    pub fn list(&self) -> Result<Vec<TrashEntry>> {
        self.store.list()
    }

    pub fn status(&self) -> Result<StatusReport> {
        let config = &self.ctx.config;
        let entries = self.store.list()?;
        let rm_resolves_to =
            which::which_in("rm", config.search_path.as_deref(), &self.ctx.cwd).ok();
        let binary = config
            .safe_rm_binary
            .canonicalize()
            .unwrap_or_else(|_| config.safe_rm_binary.clone());
        let installed = rm_resolves_to
            .as_ref()
            .and_then(|rm| rm.canonicalize().ok())
            .is_some_and(|rm| rm == binary);
        debug!(installed, "computed installation status");

        Ok(StatusReport {
            installed,
            rm_resolves_to,
            binary_present: self.store.fs().exists(&config.safe_rm_binary),
            safe_rm_binary: config.safe_rm_binary.clone(),
            trash_root: config.trash_root.clone(),
            log_path: config.log_path(),
            entry_count: entries.len(),
            total_size_bytes: entries.iter().map(|entry| entry.size_bytes).sum(),
        })
    }
}

/// Renders the listing shown by `--list-trash` and the `list_trash` tool.
pub fn format_listing(entries: &[TrashEntry], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "Trash is empty".to_string();
    }
    let mut out = format!("Items in trash ({}):\n", entries.len());
    for entry in entries {
        let age = (now - entry.deleted_at).to_std().unwrap_or_default();
        out.push_str(&format!(
            "  {}  [{}, {}]  deleted {} ({} ago)\n    from: {}\n",
            entry.trash_id,
            entry.kind.as_str(),
            print_size(entry.size_bytes),
            entry.deleted_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            format_duration(age),
            entry.original_display(),
        ));
    }
    out.push_str("\nRestore with: rm --restore <trash_id>");
    out
}

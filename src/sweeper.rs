//! Retention sweeper: permanently purges entries older than the window.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::models::TrashId;
use crate::store::TrashStore;

/// Threshold used by the `clean_old_trash` tool.
pub const DEFAULT_MAX_AGE_DAYS: u64 = 7;

const MAX_AGE_DAYS_CAP: i64 = 3_650_000;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<TrashId>,
    pub kept: usize,
    /// Entries that were eligible but could not be removed, with the reason.
    pub failed: Vec<(TrashId, String)>,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cleaned {} item(s) from trash, {} kept",
            self.removed.len(),
            self.kept
        )?;
        for id in &self.removed {
            write!(f, "\n  removed: {id}")?;
        }
        for (id, reason) in &self.failed {
            write!(f, "\n  failed: {id}: {reason}")?;
        }
        Ok(())
    }
}

pub struct RetentionSweeper<'a, F: FileSystem = RealFileSystem> {
    store: &'a TrashStore<F>,
}

impl<'a, F: FileSystem> RetentionSweeper<'a, F> {
    pub fn new(store: &'a TrashStore<F>) -> Self {
        Self { store }
    }

    /// Removes every entry deleted strictly before `now - max_age_days`.
    /// A failing entry is reported and skipped; the sweep always finishes.
    pub fn clean_old(&self, max_age_days: u64) -> Result<SweepReport> {
        let now = DateTime::<Utc>::from(self.store.fs().now());
        let days = i64::try_from(max_age_days).unwrap_or(i64::MAX).min(MAX_AGE_DAYS_CAP);
        let max_age = ChronoDuration::days(days);
        let cutoff = now - max_age;

        let writer = self.store.lock()?;
        let mut report = SweepReport::default();
        for entry in self.store.list()? {
            if entry.deleted_at >= cutoff {
                report.kept += 1;
                continue;
            }
            match writer.remove(&entry.trash_id) {
                Ok(()) => report.removed.push(entry.trash_id),
                Err(err) => {
                    warn!(trash_id = %entry.trash_id, error = %err, "could not purge trash entry");
                    report.failed.push((entry.trash_id, err.to_string()));
                }
            }
        }
        info!(
            removed = report.removed.len(),
            kept = report.kept,
            failed = report.failed.len(),
            "retention sweep finished"
        );
        Ok(report)
    }
}

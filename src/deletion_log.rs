//! The deletion log: one `timestamp|original_path|trash_id` line per trashed
//! item. Appends are single writes; removals rewrite the file through a
//! temporary sibling that is renamed over the original.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{CoreError, Result};
use crate::helpers::parse_log_datetime;
use crate::models::TrashId;

const FIELD_SEPARATOR: char = '|';

/// One durable record mapping a trash id back to where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionLogRecord {
    pub timestamp: String,
    pub original_path: PathBuf,
    pub trash_id: String,
}

impl DeletionLogRecord {
    /// Parses a log line. Original paths may themselves contain `|`, so the
    /// timestamp is everything before the first separator and the id
    /// everything after the last one. Torn lines (unparseable timestamp or
    /// malformed id) are rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let (timestamp, rest) = line.split_once(FIELD_SEPARATOR)?;
        let (original_path, trash_id) = rest.rsplit_once(FIELD_SEPARATOR)?;
        if original_path.is_empty()
            || !TrashId::is_valid(trash_id)
            || parse_log_datetime(timestamp).is_none()
        {
            return None;
        }
        Some(Self {
            timestamp: timestamp.to_string(),
            original_path: PathBuf::from(original_path),
            trash_id: trash_id.to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.timestamp,
            self.original_path.display(),
            self.trash_id,
            sep = FIELD_SEPARATOR
        )
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        parse_log_datetime(&self.timestamp)
    }
}

fn matches_id(line: &str, trash_id: &str) -> bool {
    line.strip_suffix(trash_id)
        .is_some_and(|head| head.ends_with(FIELD_SEPARATOR))
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[derive(Debug, Clone)]
pub struct DeletionLog {
    path: PathBuf,
}

impl DeletionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(CoreError::io(&self.path, err)),
        }
    }

    /// All parseable records, in append order.
    pub fn records(&self) -> Result<Vec<DeletionLogRecord>> {
        Ok(self
            .read()?
            .lines()
            .filter_map(DeletionLogRecord::parse)
            .collect())
    }

    /// Locates the record for `trash_id` by exact `|<trash_id>` suffix match.
    pub fn find(&self, trash_id: &str) -> Result<Option<DeletionLogRecord>> {
        Ok(self
            .read()?
            .lines()
            .filter(|line| matches_id(line, trash_id))
            .find_map(DeletionLogRecord::parse))
    }

    /// Appends one record with a single write. Caller must hold the store lock.
    ///
    /// A previous write torn before its newline is terminated first, so the
    /// new record always starts on a line of its own.
    pub fn append(&self, record: &DeletionLogRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| CoreError::io(&self.path, err))?;
        let mut line = String::new();
        if !ends_with_newline(&mut file).map_err(|err| CoreError::io(&self.path, err))? {
            debug!(log = %self.path.display(), "terminating torn deletion log line");
            line.push('\n');
        }
        line.push_str(&record.to_line());
        line.push('\n');
        file.write_all(line.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|err| CoreError::io(&self.path, err))?;
        debug!(trash_id = %record.trash_id, "appended deletion log record");
        Ok(())
    }

    /// Drops every line for `trash_id`, replacing the log atomically.
    /// Returns whether anything was removed. Caller must hold the store lock.
    pub fn remove(&self, trash_id: &str) -> Result<bool> {
        let content = self.read()?;
        let mut removed = false;
        let mut kept = String::with_capacity(content.len());
        for line in content.lines() {
            if matches_id(line, trash_id) {
                removed = true;
            } else {
                kept.push_str(line);
                kept.push('\n');
            }
        }
        if !removed {
            return Ok(false);
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|err| CoreError::io(dir, err))?;
        tmp.write_all(kept.as_bytes())
            .and_then(|_| tmp.as_file().sync_data())
            .map_err(|err| CoreError::io(tmp.path(), err))?;
        tmp.persist(&self.path)
            .map_err(|err| CoreError::io(&self.path, err.error))?;
        debug!(trash_id, "removed deletion log record");
        Ok(true)
    }
}

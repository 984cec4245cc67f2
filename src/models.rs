use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::errors::{CoreError, Result};

/// Placeholder reported when no log record maps an entry to its origin.
pub const UNKNOWN_ORIGINAL_PATH: &str = "Unknown";

const TRASH_ID_PATTERN: &str = r"^[0-9]{8}_[0-9]{6}_[\w\-.]+$";

fn trash_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TRASH_ID_PATTERN).expect("trash id pattern is valid"))
}

/// Operation family, used to tag diagnostics.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandKind {
    Delete,
    List,
    Restore,
    Info,
    Status,
    Clean,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::List => "list-trash",
            Self::Restore => "restore",
            Self::Info => "info",
            Self::Status => "status",
            Self::Clean => "clean-old",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated trash identifier: `YYYYMMDD_HHMMSS_<sanitized basename>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrashId(String);

impl TrashId {
    /// Validates `value` against the trash id format before any lookup.
    pub fn parse(value: &str) -> Result<Self> {
        if Self::is_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(CoreError::InvalidIdFormat(value.to_string()))
        }
    }

    pub fn is_valid(value: &str) -> bool {
        trash_id_regex().is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

/// One deleted filesystem object held in the trash root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashEntry {
    pub trash_id: TrashId,
    /// `None` when the deletion log has no record for this entry.
    pub original_path: Option<PathBuf>,
    pub stored_path: PathBuf,
    pub kind: EntryKind,
    pub deleted_at: DateTime<Utc>,
    /// Recursive total for directories.
    pub size_bytes: u64,
}

impl TrashEntry {
    pub fn original_display(&self) -> String {
        self.original_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| UNKNOWN_ORIGINAL_PATH.to_string())
    }

    pub fn info(&self) -> TrashInfo {
        TrashInfo {
            trash_id: self.trash_id.to_string(),
            original_path: self.original_display(),
            kind: self.kind,
            deleted_at: self.deleted_at.to_rfc3339(),
            size_bytes: self.size_bytes,
        }
    }
}

/// Read-only view handed to query consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashInfo {
    pub trash_id: String,
    pub original_path: String,
    pub kind: EntryKind,
    pub deleted_at: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatusLike {
    Ok,
    Warning,
    Error,
}

impl ExitStatusLike {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 2,
            Self::Error => 1,
        }
    }
}

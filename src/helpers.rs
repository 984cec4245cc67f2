//! Shared utility helpers for naming, timestamps and path handling.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Timestamp prefix format of every trash id.
pub const TRASH_ID_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Naive fallback format accepted when reading deletion log timestamps.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Reduces a basename to the `[\w\-.]` alphabet allowed in trash ids.
pub fn sanitize_basename(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned
    }
}

/// Builds the disambiguated basename used after a same-second collision.
pub fn build_unique_basename(file_name: &str, suffix: u64) -> String {
    format!("{file_name}.{suffix}")
}

/// Formats the local-time `YYYYMMDD_HHMMSS` prefix of a trash id.
pub fn trash_id_prefix(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(TRASH_ID_TIME_FORMAT)
        .to_string()
}

/// Recovers the deletion time encoded in a trash id prefix.
pub fn parse_trash_id_time(trash_id: &str) -> Option<DateTime<Utc>> {
    let prefix = trash_id.get(..15)?;
    let naive = NaiveDateTime::parse_from_str(prefix, TRASH_ID_TIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses a deletion log timestamp into a UTC datetime.
pub fn parse_log_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, LOG_TIME_FORMAT)
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

/// Serializes a system time into the deletion log timestamp format.
pub fn serialize_system_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Human readable size rendering shared across commands.
pub fn print_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut idx = 0usize;

    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{:.0} {}", value, SUFFIXES[idx])
    } else {
        format!("{:.1} {}", value, SUFFIXES[idx])
    }
}

/// Produces a human readable age string from duration.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;
    let rem_secs = secs % 60;
    let rem_mins = mins % 60;
    let rem_hours = hours % 24;

    if days > 0 {
        format!("{days}d {rem_hours:02}:{rem_mins:02}:{rem_secs:02}")
    } else if hours > 0 {
        format!("{hours}h {rem_mins:02}:{rem_secs:02}")
    } else if mins > 0 {
        format!("{mins}m {rem_secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// Quotes `value` for a POSIX shell so it is always a single literal word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Expands a leading `~` and makes `path` absolute against `cwd`, folding
/// `.` and `..` lexically. Symlinks are not resolved.
pub fn absolutize(path: &str, cwd: &Path, home: Option<&Path>) -> PathBuf {
    let expanded = match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    };
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

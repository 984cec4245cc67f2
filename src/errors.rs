use std::{io, path::PathBuf};

use crate::gate::AbortReason;
use crate::models::ExitStatusLike;

/// Shared error type for every safe-rm component.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// File system I/O failure.
    #[error("I/O error while accessing {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    /// Unknown trash id or missing deletion target.
    #[error("not found: {0}")]
    NotFound(String),

    /// The confirmation gate did not reach `Approved`.
    #[error("deletion cancelled: {0}")]
    Aborted(AbortReason),

    /// The target is refused by the protection policy.
    #[error("refusing to delete protected path: {0}")]
    ProtectedPath(PathBuf),

    /// Something already occupies the restore destination.
    #[error("restore destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// No log record maps the trash id back to its original location.
    #[error("cannot restore {0}: original path is not recorded in the deletion log")]
    DegradedRestore(String),

    /// Moving the target into the trash failed; the target is untouched.
    #[error("failed to move {path} to trash: {source}")]
    DeletionFailed {
        path: PathBuf,
        #[source]
        source: Box<CoreError>,
    },

    /// The store lock could not be acquired in time.
    #[error("timed out after {waited_secs}s waiting for lock {path}")]
    LockTimeout { path: PathBuf, waited_secs: u64 },

    /// A facade call did not finish within its time budget.
    #[error("{tool} timed out after {waited_ms}ms")]
    ToolTimeout { tool: String, waited_ms: u128 },

    /// The worker running a facade call died before answering.
    #[error("tool worker failed: {0}")]
    ToolFailed(String),

    /// A trash id failed format validation.
    #[error("invalid trash_id format: {0}")]
    InvalidIdFormat(String),

    /// A required tool argument was absent or empty.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// A path is invalid for the current operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An input was rejected due to configuration/argument issues.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required configuration value could not be resolved.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// A conflict prevented the operation from proceeding.
    #[error("resource conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingValue(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    pub fn deletion_failed(path: impl Into<PathBuf>, source: CoreError) -> Self {
        Self::DeletionFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// True for user-driven cancellations, which leave no side effects.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    pub fn exit_status(&self) -> ExitStatusLike {
        if self.is_cancellation() {
            ExitStatusLike::Warning
        } else {
            ExitStatusLike::Error
        }
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_maps_to_warning_exit() {
        let err = CoreError::Aborted(AbortReason::WordMismatch);
        assert!(err.is_cancellation());
        assert_eq!(err.exit_status().as_code(), 2);

        let err = CoreError::not_found("20240115_103045_foo.txt");
        assert!(!err.is_cancellation());
        assert_eq!(err.exit_status().as_code(), 1);
    }

    #[test]
    fn deletion_failed_keeps_source_message() {
        let inner = CoreError::io(
            "/tmp/a",
            io::Error::new(io::ErrorKind::Other, "cross-device link"),
        );
        let err = CoreError::deletion_failed("/tmp/a", inner);
        assert!(err.to_string().contains("cross-device link"));
    }
}

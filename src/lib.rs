//! Guarded deletion core for safe-rm.
//!
//! Deletions are diverted into a trash root, gated behind a three-stage
//! interactive confirmation, and stay restorable by trash id until the
//! retention window expires. A tool-call facade exposes the non-destructive
//! operations to agent integrations.

pub mod config;
pub mod deletion_log;
pub mod engine;
pub mod errors;
pub mod facade;
pub mod fs;
pub mod gate;
pub mod helpers;
pub mod lock;
pub mod models;
pub mod policy;
pub mod restore;
pub mod store;
pub mod sweeper;
pub mod telemetry;

pub use config::{SafeRmConfig, SafeRmContext};
pub use deletion_log::{DeletionLog, DeletionLogRecord};
pub use engine::{restore_hint, DeletionEngine};
pub use errors::{CoreError, Result};
pub use facade::{tool_definitions, Tool, ToolFacade, ToolResponse};
pub use fs::{FileSystem, RealFileSystem};
pub use gate::{
    AbortReason, Challenge, ConfirmationPrompter, ConfirmationSession, GateState, StreamPrompter,
};
pub use models::{
    CommandKind, EntryKind, ExitStatusLike, TrashEntry, TrashId, TrashInfo, UNKNOWN_ORIGINAL_PATH,
};
pub use policy::{PathPolicy, ProtectionPolicy};
pub use restore::{format_listing, RestoreEngine, Restored, StatusReport};
pub use store::{StoreWriter, TrashStore};
pub use sweeper::{RetentionSweeper, SweepReport, DEFAULT_MAX_AGE_DAYS};

/// Re-export a small stable API surface for command crates.
pub mod prelude {
    pub use crate::{
        config::*,
        engine::*,
        errors::{CoreError, Result},
        facade::*,
        fs::{FileSystem, RealFileSystem},
        gate::*,
        models::*,
        policy::*,
        restore::*,
        store::*,
        sweeper::*,
    };
}

//! Tool-call facade for agent integrations.
//!
//! Exposes the non-destructive trash operations as named tools taking JSON
//! arguments and returning a text envelope. Nothing here deletes: the
//! `request_deletion` tool only explains how a human can run the guarded
//! deletion interactively.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::SafeRmContext;
use crate::errors::{CoreError, Result};
use crate::gate::CONFIRM_WORD;
use crate::helpers::{absolutize, shell_quote};
use crate::models::TrashId;
use crate::restore::{format_listing, RestoreEngine};
use crate::store::TrashStore;
use crate::sweeper::{RetentionSweeper, DEFAULT_MAX_AGE_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ListTrash,
    RestoreFromTrash,
    CheckStatus,
    CleanOldTrash,
    GetTrashInfo,
    RequestDeletion,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::ListTrash,
        Tool::RestoreFromTrash,
        Tool::CheckStatus,
        Tool::CleanOldTrash,
        Tool::GetTrashInfo,
        Tool::RequestDeletion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListTrash => "list_trash",
            Self::RestoreFromTrash => "restore_from_trash",
            Self::CheckStatus => "check_status",
            Self::CleanOldTrash => "clean_old_trash",
            Self::GetTrashInfo => "get_trash_info",
            Self::RequestDeletion => "request_deletion",
        }
    }

    /// Resolves a canonical tool name or one of the legacy `safe_rm_*` names.
    pub fn from_name(name: &str) -> Option<Self> {
        let tool = match name {
            "list_trash" | "safe_rm_list_trash" => Self::ListTrash,
            "restore_from_trash" | "safe_rm_restore" => Self::RestoreFromTrash,
            "check_status" | "safe_rm_status" => Self::CheckStatus,
            "clean_old_trash" | "safe_rm_clean_old" => Self::CleanOldTrash,
            "get_trash_info" | "safe_rm_trash_info" => Self::GetTrashInfo,
            "request_deletion" | "safe_rm_request_delete" => Self::RequestDeletion,
            _ => return None,
        };
        Some(tool)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ListTrash => {
                "List all items in the safe-rm trash. Shows deleted files with their original paths and trash IDs for restoration."
            }
            Self::RestoreFromTrash => {
                "Restore a previously deleted item from trash to its original location."
            }
            Self::CheckStatus => "Check the safe-rm installation status and configuration.",
            Self::CleanOldTrash => "Remove items older than 7 days from trash.",
            Self::GetTrashInfo => "Get information about a specific item in trash.",
            Self::RequestDeletion => {
                "Request deletion of a file/directory. This does NOT delete - it returns instructions for the user to perform the deletion manually with required confirmations."
            }
        }
    }

    pub fn input_schema(&self) -> Value {
        let string_arg = |name: &str, description: &str| {
            let mut properties = serde_json::Map::new();
            properties.insert(
                name.to_string(),
                json!({ "type": "string", "description": description }),
            );
            json!({
                "type": "object",
                "properties": properties,
                "required": [name],
            })
        };
        match self {
            Self::RestoreFromTrash => string_arg(
                "trash_id",
                "The trash ID of the item to restore (from list_trash output)",
            ),
            Self::GetTrashInfo => string_arg("trash_id", "The trash ID to get info about"),
            Self::RequestDeletion => string_arg("path", "The path to request deletion for"),
            _ => json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }
}

/// Advertised definition of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    Tool::ALL
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name(),
            description: tool.description(),
            input_schema: tool.input_schema(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Response envelope returned for every call, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

pub struct ToolFacade {
    ctx: Arc<SafeRmContext>,
}

impl ToolFacade {
    pub fn new(ctx: SafeRmContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Dispatches one tool call. Every failure, including a timeout, comes
    /// back as an error envelope rather than a panic or a hang.
    pub fn call(&self, name: &str, arguments: &Value) -> ToolResponse {
        let Some(tool) = Tool::from_name(name) else {
            return ToolResponse::error(format!("Unknown tool: {name}"));
        };
        debug!(tool = tool.name(), "tool call");
        match self.call_with_timeout(tool, arguments.clone()) {
            Ok(text) => ToolResponse::text(text),
            Err(err) => {
                warn!(tool = tool.name(), error = %err, "tool call failed");
                ToolResponse::error(format!("Error: {err}"))
            }
        }
    }

    fn call_with_timeout(&self, tool: Tool, arguments: Value) -> Result<String> {
        let ctx = Arc::clone(&self.ctx);
        run_bounded(tool.name(), self.ctx.config.tool_timeout, move || {
            dispatch(&ctx, tool, &arguments)
        })
    }
}

/// Runs `job` on a worker thread and waits at most `timeout` for its answer.
/// A worker that dies without answering is reported as failed, not timed out.
fn run_bounded<T, J>(name: &str, timeout: Duration, job: J) -> Result<T>
where
    T: Send + 'static,
    J: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("safe-rm-{name}"))
        .spawn(move || {
            let _ = tx.send(job());
        })
        .map_err(|err| CoreError::io("<tool worker>", err))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(CoreError::ToolTimeout {
            tool: name.to_string(),
            waited_ms: timeout.as_millis(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(CoreError::ToolFailed(name.to_string())),
    }
}

fn dispatch(ctx: &SafeRmContext, tool: Tool, arguments: &Value) -> Result<String> {
    match tool {
        Tool::ListTrash => list_trash(ctx),
        Tool::RestoreFromTrash => restore_from_trash(ctx, required_str(arguments, "trash_id")?),
        Tool::CheckStatus => check_status(ctx),
        Tool::CleanOldTrash => clean_old_trash(ctx),
        Tool::GetTrashInfo => get_trash_info(ctx, required_str(arguments, "trash_id")?),
        Tool::RequestDeletion => request_deletion(ctx, required_str(arguments, "path")?),
    }
}

fn required_str<'v>(arguments: &'v Value, key: &str) -> Result<&'v str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| CoreError::MissingArgument(key.to_string()))
}

pub fn list_trash(ctx: &SafeRmContext) -> Result<String> {
    let store = TrashStore::new(&ctx.config);
    Ok(format_listing(&store.list()?, Utc::now()))
}

pub fn restore_from_trash(ctx: &SafeRmContext, trash_id: &str) -> Result<String> {
    let trash_id = TrashId::parse(trash_id)?;
    let store = TrashStore::new(&ctx.config);
    Ok(RestoreEngine::new(ctx, &store).restore(&trash_id)?.to_string())
}

pub fn check_status(ctx: &SafeRmContext) -> Result<String> {
    let store = TrashStore::new(&ctx.config);
    Ok(RestoreEngine::new(ctx, &store).status()?.to_string())
}

pub fn clean_old_trash(ctx: &SafeRmContext) -> Result<String> {
    let store = TrashStore::new(&ctx.config);
    Ok(RetentionSweeper::new(&store)
        .clean_old(DEFAULT_MAX_AGE_DAYS)?
        .to_string())
}

pub fn get_trash_info(ctx: &SafeRmContext, trash_id: &str) -> Result<String> {
    let trash_id = TrashId::parse(trash_id)?;
    let store = TrashStore::new(&ctx.config);
    let info = RestoreEngine::new(ctx, &store).info(&trash_id)?;
    serde_json::to_string_pretty(&info).map_err(|err| CoreError::invalid_input(err.to_string()))
}

/// Builds the advisory for a deletion request. Never touches the filesystem.
pub fn request_deletion(ctx: &SafeRmContext, path: &str) -> Result<String> {
    let absolute = absolutize(path.trim(), &ctx.cwd, ctx.home());
    let shown = absolute.display().to_string();
    Ok(format!(
        "DELETION REQUEST\n\n\
         To delete: {shown}\n\n\
         I cannot delete files directly. Please run:\n\n\
         rm -rf {quoted}\n\n\
         You will need to:\n\
         1. Type the full path to confirm\n\
         2. Solve a math problem (e.g., 3847291 + 5192847 = ?)\n\
         3. Type '{CONFIRM_WORD}'\n\n\
         Item moves to trash for {DEFAULT_MAX_AGE_DAYS} days. Restore with:\n\
         rm --list-trash\n\
         rm --restore <trash_id>",
        quoted = shell_quote(&shown),
    ))
}

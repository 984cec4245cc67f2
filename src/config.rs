//! Process-wide configuration, resolved once at startup from the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{CoreError, Result};

pub const TRASH_DIR_ENV: &str = "SAFE_RM_TRASH_DIR";
pub const BINARY_PATH_ENV: &str = "SAFE_RM_PATH";
pub const RETENTION_DAYS_ENV: &str = "SAFE_RM_RETENTION_DAYS";
pub const LOCK_TIMEOUT_ENV: &str = "SAFE_RM_LOCK_TIMEOUT_SECS";
pub const PROTECT_ENV: &str = "SAFE_RM_PROTECT";

pub const DEFAULT_TRASH_DIR_NAME: &str = ".safe-rm-trash";
pub const DELETION_LOG_NAME: &str = ".deletion-log";
pub const LOCK_FILE_NAME: &str = ".deletion-log.lock";
pub const DEFAULT_RETENTION_DAYS: u64 = 7;
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
pub const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

type EnvVarMap = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct SafeRmConfig {
    pub trash_root: PathBuf,
    pub safe_rm_binary: PathBuf,
    pub retention_days: u64,
    pub lock_timeout: Duration,
    pub tool_timeout: Duration,
    pub home: Option<PathBuf>,
    /// User-supplied additions to the built-in protected list.
    pub extra_protected: Vec<PathBuf>,
    /// Raw `PATH`, consulted when reporting installation status.
    pub search_path: Option<String>,
}

impl SafeRmConfig {
    /// Resolves configuration from an environment snapshot.
    pub fn from_environ(environ: &EnvVarMap) -> Result<Self> {
        let home = environ
            .get("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from);

        let trash_root = match non_empty(environ, TRASH_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => home
                .as_ref()
                .map(|home| home.join(DEFAULT_TRASH_DIR_NAME))
                .ok_or_else(|| CoreError::missing(format!("HOME or {TRASH_DIR_ENV}")))?,
        };

        let safe_rm_binary = match non_empty(environ, BINARY_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => home
                .as_ref()
                .map(|home| home.join("bin").join("safe-rm"))
                .ok_or_else(|| CoreError::missing(format!("HOME or {BINARY_PATH_ENV}")))?,
        };

        let retention_days = match non_empty(environ, RETENTION_DAYS_ENV) {
            Some(raw) => raw.parse().map_err(|_| {
                CoreError::invalid_input(format!(
                    "{RETENTION_DAYS_ENV} must be a whole number, got {raw}"
                ))
            })?,
            None => DEFAULT_RETENTION_DAYS,
        };

        let lock_timeout = match non_empty(environ, LOCK_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                CoreError::invalid_input(format!(
                    "{LOCK_TIMEOUT_ENV} must be a whole number, got {raw}"
                ))
            })?),
            None => DEFAULT_LOCK_TIMEOUT,
        };

        let extra_protected = non_empty(environ, PROTECT_ENV)
            .map(|raw| {
                raw.split(':')
                    .filter(|path| !path.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            trash_root,
            safe_rm_binary,
            retention_days,
            lock_timeout,
            tool_timeout: TOOL_CALL_TIMEOUT,
            home,
            extra_protected,
            search_path: environ.get("PATH").cloned(),
        })
    }

    /// Configuration rooted at an explicit trash directory, with defaults
    /// for everything else.
    pub fn with_trash_root(trash_root: impl Into<PathBuf>) -> Self {
        let trash_root = trash_root.into();
        Self {
            safe_rm_binary: trash_root.join("safe-rm"),
            trash_root,
            retention_days: DEFAULT_RETENTION_DAYS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            tool_timeout: TOOL_CALL_TIMEOUT,
            home: None,
            extra_protected: Vec::new(),
            search_path: None,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.trash_root.join(DELETION_LOG_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.trash_root.join(LOCK_FILE_NAME)
    }
}

fn non_empty<'a>(environ: &'a EnvVarMap, key: &str) -> Option<&'a str> {
    environ
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Explicit context passed to every component.
#[derive(Debug, Clone)]
pub struct SafeRmContext {
    pub config: SafeRmConfig,
    pub cwd: PathBuf,
}

impl SafeRmContext {
    pub fn new(config: SafeRmConfig, cwd: impl Into<PathBuf>) -> Self {
        Self {
            config,
            cwd: cwd.into(),
        }
    }

    pub fn home(&self) -> Option<&Path> {
        self.config.home.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environ(pairs: &[(&str, &str)]) -> EnvVarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_live_under_home() {
        let config = SafeRmConfig::from_environ(&environ(&[("HOME", "/home/ana")])).unwrap();
        assert_eq!(config.trash_root, PathBuf::from("/home/ana/.safe-rm-trash"));
        assert_eq!(config.safe_rm_binary, PathBuf::from("/home/ana/bin/safe-rm"));
        assert_eq!(config.log_path(), PathBuf::from("/home/ana/.safe-rm-trash/.deletion-log"));
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides_win() {
        let config = SafeRmConfig::from_environ(&environ(&[
            ("HOME", "/home/ana"),
            (TRASH_DIR_ENV, "/srv/trash"),
            (BINARY_PATH_ENV, "/usr/local/bin/safe-rm"),
            (RETENTION_DAYS_ENV, "14"),
            (LOCK_TIMEOUT_ENV, "1"),
            (PROTECT_ENV, "/data::/srv/db"),
        ]))
        .unwrap();
        assert_eq!(config.trash_root, PathBuf::from("/srv/trash"));
        assert_eq!(config.safe_rm_binary, PathBuf::from("/usr/local/bin/safe-rm"));
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.lock_timeout, Duration::from_secs(1));
        assert_eq!(
            config.extra_protected,
            vec![PathBuf::from("/data"), PathBuf::from("/srv/db")]
        );
    }

    #[test]
    fn missing_home_without_overrides_fails() {
        let err = SafeRmConfig::from_environ(&EnvVarMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::MissingValue(_)));
    }

    #[test]
    fn malformed_retention_is_rejected() {
        let err = SafeRmConfig::from_environ(&environ(&[
            ("HOME", "/home/ana"),
            (RETENTION_DAYS_ENV, "a week"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(RETENTION_DAYS_ENV));
    }
}

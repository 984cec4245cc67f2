//! Paths that must never be sent to the trash.

use std::path::{Path, PathBuf};

use crate::config::SafeRmConfig;
use crate::errors::{CoreError, Result};

const SYSTEM_ROOTS: &[&str] = &[
    "/",
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/lib64",
    "/opt",
    "/proc",
    "/root",
    "/sbin",
    "/sys",
    "/usr",
    "/var",
    "/System",
    "/Library",
    "/Applications",
    "/Users",
];

/// Pluggable predicate consulted before any deletion.
pub trait PathPolicy: Send + Sync {
    fn check(&self, path: &Path) -> Result<()>;
}

/// Refuses system roots and configured exact paths, the user's home, and the
/// trash root together with everything inside it.
#[derive(Debug, Clone)]
pub struct ProtectionPolicy {
    exact: Vec<PathBuf>,
    subtree: Vec<PathBuf>,
}

impl ProtectionPolicy {
    pub fn from_config(config: &SafeRmConfig) -> Self {
        let mut exact: Vec<PathBuf> = SYSTEM_ROOTS.iter().map(PathBuf::from).collect();
        exact.extend(config.home.iter().cloned());
        exact.extend(config.extra_protected.iter().cloned());

        let mut subtree = vec![config.trash_root.clone()];
        if let Ok(canonical) = config.trash_root.canonicalize() {
            if canonical != config.trash_root {
                subtree.push(canonical);
            }
        }
        Self { exact, subtree }
    }
}

impl PathPolicy for ProtectionPolicy {
    fn check(&self, path: &Path) -> Result<()> {
        let refused = self.exact.iter().any(|protected| protected == path)
            || self.subtree.iter().any(|root| path.starts_with(root));
        if refused {
            Err(CoreError::ProtectedPath(path.to_path_buf()))
        } else {
            Ok(())
        }
    }
}

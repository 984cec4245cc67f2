//! Deletion engine: validate the target, pass the confirmation gate, then
//! move the target into the trash store.

use std::path::{Component, Path, PathBuf};

use rand::Rng;
use tracing::{info, warn};

use crate::config::SafeRmContext;
use crate::errors::{CoreError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::gate::{ConfirmationPrompter, ConfirmationSession};
use crate::helpers::absolutize;
use crate::models::TrashEntry;
use crate::policy::PathPolicy;
use crate::store::{check_recordable, TrashStore};

pub struct DeletionEngine<'a, F: FileSystem = RealFileSystem> {
    ctx: &'a SafeRmContext,
    store: &'a TrashStore<F>,
    policy: &'a dyn PathPolicy,
}

impl<'a, F: FileSystem> DeletionEngine<'a, F> {
    pub fn new(
        ctx: &'a SafeRmContext,
        store: &'a TrashStore<F>,
        policy: &'a dyn PathPolicy,
    ) -> Self {
        Self { ctx, store, policy }
    }

    /// Resolves `target` to an absolute path whose parent is canonical. The
    /// last component is kept as-is so a symlink is trashed, not its target.
    pub fn resolve(&self, target: &str) -> Result<PathBuf> {
        if target.is_empty() {
            return Err(CoreError::MissingArgument("path".to_string()));
        }
        if matches!(
            Path::new(target).components().next_back(),
            Some(Component::CurDir | Component::ParentDir)
        ) {
            return Err(CoreError::InvalidPath(format!(
                "refusing to remove '.' or '..' directory: {target}"
            )));
        }

        let absolute = absolutize(target, &self.ctx.cwd, self.ctx.home());
        let resolved = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map_err(|_| CoreError::not_found(target.to_string()))?
                .join(name),
            _ => absolute,
        };
        if !self.store.fs().exists(&resolved) {
            return Err(CoreError::not_found(target.to_string()));
        }
        check_recordable(&resolved)?;
        Ok(resolved)
    }

    /// Deletes `target` into the trash after an approved confirmation.
    ///
    /// On success the original path is gone and the returned entry is
    /// retrievable by its trash id. On cancellation or failure the target is
    /// left exactly as it was.
    pub fn delete<R: Rng + ?Sized>(
        &self,
        target: &str,
        recursive: bool,
        prompter: &mut dyn ConfirmationPrompter,
        rng: &mut R,
    ) -> Result<TrashEntry> {
        let resolved = self.resolve(target)?;
        self.policy.check(&resolved)?;

        let metadata = self.store.fs().symlink_metadata(&resolved)?;
        if metadata.is_dir() && !recursive {
            return Err(CoreError::InvalidPath(format!(
                "cannot remove '{}': Is a directory",
                resolved.display()
            )));
        }

        ConfirmationSession::new(&resolved, rng).run(prompter)?;

        let entry = self.store.put(&resolved).map_err(|err| {
            warn!(target = %resolved.display(), error = %err, "trash move failed");
            err
        })?;
        info!(trash_id = %entry.trash_id, "deletion approved and trashed");
        prompter.notify(&restore_hint(&entry))?;
        Ok(entry)
    }
}

/// Message shown after a successful deletion.
pub fn restore_hint(entry: &TrashEntry) -> String {
    format!(
        "Moved to trash: {}\nTrash ID: {}\nRestore with: rm --restore {}",
        entry.original_display(),
        entry.trash_id,
        entry.trash_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SafeRmConfig;
    use crate::gate::{AbortReason, StreamPrompter};
    use crate::policy::ProtectionPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::io::Cursor;

    struct Fixture {
        _dir: tempfile::TempDir,
        work: PathBuf,
        ctx: SafeRmContext,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("work")).unwrap();
        let work = dir.path().join("work").canonicalize().unwrap();
        let config = SafeRmConfig::with_trash_root(dir.path().join("trash"));
        let ctx = SafeRmContext::new(config, &work);
        Fixture { _dir: dir, work, ctx }
    }

    /// Answers the gate correctly by replaying the seeded challenge.
    fn answers_for(path: &Path, seed: u64, word: &str) -> String {
        let mut rng = StdRng::seed_from_u64(seed);
        let session = ConfirmationSession::new(path, &mut rng);
        format!("{}\n{}\n{word}\n", path.display(), session.challenge().answer())
    }

    #[test]
    fn approved_delete_moves_target_into_trash() {
        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);
        let target = fx.work.join("foo.txt");
        fs::write(&target, b"payload").unwrap();

        let input = answers_for(&target, 7, "DELETE");
        let mut prompter = StreamPrompter::new(Cursor::new(input), Vec::new());
        let entry = engine
            .delete("foo.txt", false, &mut prompter, &mut StdRng::seed_from_u64(7))
            .unwrap();

        assert!(!target.exists());
        assert_eq!(store.get(&entry.trash_id).unwrap().original_path, Some(target));
        let shown = String::from_utf8(prompter.into_writer()).unwrap();
        assert!(shown.contains(&format!("Trash ID: {}", entry.trash_id)));
    }

    #[test]
    fn wrong_word_leaves_everything_untouched() {
        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);
        let target = fx.work.join("keep.txt");
        fs::write(&target, b"precious").unwrap();

        let input = answers_for(&target, 11, "delete");
        let mut prompter = StreamPrompter::new(Cursor::new(input), Vec::new());
        let err = engine
            .delete("keep.txt", false, &mut prompter, &mut StdRng::seed_from_u64(11))
            .unwrap_err();

        assert!(matches!(err, CoreError::Aborted(AbortReason::WordMismatch)));
        assert_eq!(fs::read(&target).unwrap(), b"precious");
        assert!(store.list().unwrap().is_empty());
        assert!(store.log().records().unwrap().is_empty());
    }

    #[test]
    fn directory_requires_recursive_flag() {
        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);
        fs::create_dir_all(fx.work.join("dir/sub")).unwrap();

        let mut prompter = StreamPrompter::new(Cursor::new(""), Vec::new());
        let err = engine
            .delete("dir", false, &mut prompter, &mut rand::thread_rng())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPath(_)));
        assert!(fx.work.join("dir/sub").exists());
    }

    #[test]
    fn missing_and_protected_targets_are_refused_before_prompting() {
        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);

        let mut prompter = StreamPrompter::new(Cursor::new(""), Vec::new());
        assert!(matches!(
            engine.delete("nope.txt", false, &mut prompter, &mut rand::thread_rng()),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            engine.delete("/etc", true, &mut prompter, &mut rand::thread_rng()),
            Err(CoreError::ProtectedPath(_))
        ));
        assert!(matches!(
            engine.delete(".", true, &mut prompter, &mut rand::thread_rng()),
            Err(CoreError::InvalidPath(_))
        ));
        assert!(prompter.into_writer().is_empty());
    }

    #[test]
    fn newline_paths_are_refused_before_prompting() {
        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);
        let target = fx.work.join("two\nlines");
        fs::write(&target, b"x").unwrap();

        let mut prompter = StreamPrompter::new(Cursor::new(""), Vec::new());
        let err = engine
            .delete("two\nlines", false, &mut prompter, &mut rand::thread_rng())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPath(_)));
        assert!(target.exists());
        assert!(prompter.into_writer().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_targets_are_refused_before_prompting() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);
        let odd = fx.work.join(OsStr::from_bytes(b"caf\xe9"));
        if fs::create_dir(&odd).is_err() {
            // Some filesystems only accept UTF-8 names.
            return;
        }
        fs::write(odd.join("f.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(&odd, fx.work.join("alias")).unwrap();

        let mut prompter = StreamPrompter::new(Cursor::new(""), Vec::new());
        let err = engine
            .delete("alias/f.txt", false, &mut prompter, &mut rand::thread_rng())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPath(_)));
        assert!(odd.join("f.txt").exists());
        assert!(prompter.into_writer().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_trashed_not_its_target() {
        let fx = fixture();
        let store = TrashStore::new(&fx.ctx.config);
        let policy = ProtectionPolicy::from_config(&fx.ctx.config);
        let engine = DeletionEngine::new(&fx.ctx, &store, &policy);
        let real = fx.work.join("real.txt");
        let link = fx.work.join("link.txt");
        fs::write(&real, b"data").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(engine.resolve("link.txt").unwrap(), link);
        let input = answers_for(&link, 3, "DELETE");
        let mut prompter = StreamPrompter::new(Cursor::new(input), Vec::new());
        engine
            .delete("link.txt", false, &mut prompter, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert!(real.exists());
        assert!(fs::symlink_metadata(&link).is_err());
    }
}

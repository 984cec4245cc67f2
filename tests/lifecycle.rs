use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use safe_rm_core::prelude::*;
use serde_json::json;

struct Sandbox {
    _dir: tempfile::TempDir,
    work: PathBuf,
    ctx: SafeRmContext,
}

fn sandbox() -> Sandbox {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("work")).unwrap();
    let work = dir.path().join("work").canonicalize().unwrap();
    let mut config = SafeRmConfig::with_trash_root(dir.path().join("trash"));
    config.search_path = Some(String::new());
    let ctx = SafeRmContext::new(config, &work);
    Sandbox {
        _dir: dir,
        work,
        ctx,
    }
}

fn scripted_answers(target: &Path, seed: u64, word: &str) -> Cursor<String> {
    let challenge = ConfirmationSession::new(target, &mut StdRng::seed_from_u64(seed)).challenge();
    Cursor::new(format!("{}\n{}\n{word}\n", target.display(), challenge.answer()))
}

fn delete(sb: &Sandbox, name: &str, recursive: bool, seed: u64, word: &str) -> Result<TrashEntry> {
    let store = TrashStore::new(&sb.ctx.config);
    let policy = ProtectionPolicy::from_config(&sb.ctx.config);
    let engine = DeletionEngine::new(&sb.ctx, &store, &policy);
    let target = sb.work.join(name);
    let mut prompter = StreamPrompter::new(scripted_answers(&target, seed, word), Vec::new());
    engine.delete(name, recursive, &mut prompter, &mut StdRng::seed_from_u64(seed))
}

#[test]
fn delete_list_info_restore_lifecycle() {
    let sb = sandbox();
    let target = sb.work.join("foo.txt");
    fs::write(&target, b"original bytes").unwrap();

    let entry = delete(&sb, "foo.txt", false, 42, "DELETE").unwrap();
    assert!(!target.exists());
    assert!(TrashId::is_valid(entry.trash_id.as_str()));
    assert!(entry.trash_id.as_str().ends_with("_foo.txt"));

    let store = TrashStore::new(&sb.ctx.config);
    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].trash_id, entry.trash_id);

    let queries = RestoreEngine::new(&sb.ctx, &store);
    let info = queries.info(&entry.trash_id).unwrap();
    assert_eq!(info.original_path, target.display().to_string());
    assert_eq!(info.size_bytes, 14);

    queries.restore(&entry.trash_id).unwrap();
    assert_eq!(fs::read(&target).unwrap(), b"original bytes");
    assert!(matches!(
        queries.restore(&entry.trash_id),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn every_cancelled_stage_leaves_no_trace() {
    let sb = sandbox();
    let target = sb.work.join("keep.txt");
    fs::write(&target, b"unchanged").unwrap();

    let store = TrashStore::new(&sb.ctx.config);
    let policy = ProtectionPolicy::from_config(&sb.ctx.config);
    let engine = DeletionEngine::new(&sb.ctx, &store, &policy);
    let scripts = [
        format!("{}/other.txt\n", sb.work.display()),
        format!("{}\n0\n", target.display()),
        String::new(),
    ];
    for script in scripts {
        let mut prompter = StreamPrompter::new(Cursor::new(script), Vec::new());
        let err = engine
            .delete("keep.txt", false, &mut prompter, &mut rand::thread_rng())
            .unwrap_err();
        assert!(err.is_cancellation(), "unexpected error: {err}");
    }
    assert!(matches!(
        delete(&sb, "keep.txt", false, 9, "Delete"),
        Err(CoreError::Aborted(AbortReason::WordMismatch))
    ));

    assert_eq!(fs::read(&target).unwrap(), b"unchanged");
    assert!(store.list().unwrap().is_empty());
    assert!(store.log().records().unwrap().is_empty());
}

#[test]
fn directory_roundtrip_preserves_tree() {
    let sb = sandbox();
    let tree = sb.work.join("project");
    fs::create_dir_all(tree.join("src/nested")).unwrap();
    fs::write(tree.join("README"), b"hello").unwrap();
    fs::write(tree.join("src/nested/lib.rs"), b"fn main() {}").unwrap();

    let entry = delete(&sb, "project", true, 5, "DELETE").unwrap();
    assert!(!tree.exists());
    assert_eq!(entry.kind, EntryKind::Directory);
    assert_eq!(entry.size_bytes, 5 + 12);

    let store = TrashStore::new(&sb.ctx.config);
    RestoreEngine::new(&sb.ctx, &store).restore(&entry.trash_id).unwrap();
    assert_eq!(fs::read(tree.join("README")).unwrap(), b"hello");
    assert_eq!(fs::read(tree.join("src/nested/lib.rs")).unwrap(), b"fn main() {}");
}

#[test]
fn missing_log_record_degrades_info_but_blocks_restore() {
    let sb = sandbox();
    fs::write(sb.work.join("lost.txt"), b"x").unwrap();
    let entry = delete(&sb, "lost.txt", false, 1, "DELETE").unwrap();

    let store = TrashStore::new(&sb.ctx.config);
    fs::write(store.log().path(), b"").unwrap();

    let facade = ToolFacade::new(sb.ctx.clone());
    let info = facade.call("get_trash_info", &json!({ "trash_id": entry.trash_id.as_str() }));
    assert!(!info.is_error);
    let parsed: serde_json::Value = serde_json::from_str(info.first_text()).unwrap();
    assert_eq!(parsed["original_path"], UNKNOWN_ORIGINAL_PATH);

    let restored =
        facade.call("restore_from_trash", &json!({ "trash_id": entry.trash_id.as_str() }));
    assert!(restored.is_error);
    assert!(store.get(&entry.trash_id).is_ok());
}

#[test]
fn facade_rejects_path_traversal_ids() {
    let sb = sandbox();
    let facade = ToolFacade::new(sb.ctx.clone());
    for tool in ["restore_from_trash", "get_trash_info"] {
        let response = facade.call(tool, &json!({ "trash_id": "../../etc/passwd" }));
        assert!(response.is_error);
        assert!(response.first_text().contains("invalid trash_id format"));
    }
}

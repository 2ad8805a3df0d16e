use syncid_core::{FsId, LocalTree, NodeId, NodeKind, ReconcileConfig, WarningKind};
use syncid_reconcile::{
    AllowAll, PassState, ReconcileError, Reconciler, assign_filesystem_ids,
    invalidate_filesystem_ids,
};
use syncid_scan::{MemoryFs, track};

const DEBRIS: &str = "d/.debris";

fn folder(tree: &mut LocalTree, parent: NodeId, name: &str) -> NodeId {
    tree.add_child(parent, name, NodeKind::Folder).unwrap()
}

/// Track a file whose stored fingerprint matches the in-memory one.
fn file(tree: &mut LocalTree, fs: &MemoryFs, parent: NodeId, name: &str) -> NodeId {
    let node = tree.add_child(parent, name, NodeKind::File).unwrap();
    let path = tree.path(node, "/").unwrap();
    tree.set_fingerprint(node, fs.fingerprint(&path)).unwrap();
    node
}

fn config(strict: bool) -> ReconcileConfig {
    ReconcileConfig::builder()
        .debris_path(DEBRIS)
        .separator("/")
        .strict(strict)
        .build()
        .unwrap()
}

struct Fixture {
    fs: MemoryFs,
    tree: LocalTree,
    folders: Vec<NodeId>,
    files: Vec<(NodeId, &'static str)>,
}

/// `d{ d_0{f_0_0, f_0_1}, d_1{f_1_0, d_1_1{f_1_1_0}}, f_2 }` on disk and tracked.
fn matching_fixture() -> Fixture {
    let mut fs = MemoryFs::default();
    fs.add_dir("d");
    fs.add_dir("d/d_0");
    fs.add_dir("d/d_1");
    fs.add_file("d/f_2", "f_2 content", 1_600_000_002);
    fs.add_file("d/d_0/f_0_0", "f_0_0 content", 1_600_000_000);
    fs.add_file("d/d_0/f_0_1", "f_0_1 content", 1_600_000_001);
    fs.add_file("d/d_1/f_1_0", "f_1_0 content", 1_600_000_010);
    fs.add_dir("d/d_1/d_1_1");
    fs.add_file("d/d_1/d_1_1/f_1_1_0", "f_1_1_0 content", 1_600_000_110);

    let mut tree = LocalTree::new("d");
    let root = tree.root();
    let d_0 = folder(&mut tree, root, "d_0");
    let d_1 = folder(&mut tree, root, "d_1");
    let f_2 = file(&mut tree, &fs, root, "f_2");
    let f_0_0 = file(&mut tree, &fs, d_0, "f_0_0");
    let f_0_1 = file(&mut tree, &fs, d_0, "f_0_1");
    let f_1_0 = file(&mut tree, &fs, d_1, "f_1_0");
    let d_1_1 = folder(&mut tree, d_1, "d_1_1");
    let f_1_1_0 = file(&mut tree, &fs, d_1_1, "f_1_1_0");

    Fixture {
        fs,
        tree,
        folders: vec![root, d_0, d_1, d_1_1],
        files: vec![
            (f_2, "d/f_2"),
            (f_0_0, "d/d_0/f_0_0"),
            (f_0_1, "d/d_0/f_0_1"),
            (f_1_0, "d/d_1/f_1_0"),
            (f_1_1_0, "d/d_1/d_1_1/f_1_1_0"),
        ],
    }
}

#[test]
fn test_invalidate_filesystem_ids() {
    let mut tree = LocalTree::new("d");
    let root = tree.root();
    let d_0 = folder(&mut tree, root, "d_0");
    let f_0 = tree.add_child(root, "f_0", NodeKind::File).unwrap();

    tree.set_fsid(root, Some(FsId(1))).unwrap();
    tree.set_fsid(d_0, Some(FsId(2))).unwrap();
    tree.set_fsid(f_0, Some(FsId(3))).unwrap();

    assert_eq!(invalidate_filesystem_ids(&mut tree, root), 3);

    assert!(tree.index().is_empty());
    for node in [root, d_0, f_0] {
        assert_eq!(tree.get(node).unwrap().fsid(), None);
        assert_eq!(tree.get(node).unwrap().fsid_slot(), None);
    }

    assert_eq!(invalidate_filesystem_ids(&mut tree, root), 0);
    tree.check_invariants().unwrap();
}

#[test]
fn test_invalidate_only_touches_subtree() {
    let mut fx = matching_fixture();
    let root = fx.tree.root();
    assert!(assign_filesystem_ids(&mut fx.tree, &AllowAll, &fx.fs, DEBRIS, "/", true));

    let d_0 = fx.tree.child(root, "d_0").unwrap();
    assert_eq!(invalidate_filesystem_ids(&mut fx.tree, d_0), 2);

    assert_eq!(fx.tree.index().len(), 3);
    let f_2 = fx.tree.child(root, "f_2").unwrap();
    assert!(fx.tree.get(f_2).unwrap().fsid().is_some());
    fx.tree.check_invariants().unwrap();
}

#[test]
fn test_assign_filesystem_ids_when_filesystem_matches() {
    let mut fx = matching_fixture();

    let success = assign_filesystem_ids(&mut fx.tree, &AllowAll, &fx.fs, DEBRIS, "/", true);
    assert!(success);

    for &folder in &fx.folders {
        assert_eq!(fx.tree.get(folder).unwrap().fsid(), None);
    }

    assert_eq!(fx.tree.index().len(), 5);
    for &(node, path) in &fx.files {
        let fsid = fx.fs.fsid(path).unwrap();
        let local = fx.tree.get(node).unwrap();
        assert_eq!(local.fsid(), Some(fsid));
        assert_eq!(fx.tree.lookup_fsid(fsid), Some(node));
        assert_eq!(fx.tree.index().slot_of(fsid), local.fsid_slot());
    }
    fx.tree.check_invariants().unwrap();
}

#[test]
fn test_assign_is_repeatable() {
    let mut fx = matching_fixture();
    let reconciler = Reconciler::new(config(true));

    let first = reconciler.assign(&mut fx.tree, &AllowAll, &fx.fs).unwrap();
    let second = reconciler.assign(&mut fx.tree, &AllowAll, &fx.fs).unwrap();

    assert_eq!(first.ids_assigned, 5);
    assert_eq!(second.ids_assigned, 5);
    assert_eq!(second.dirs_scanned, 4);
    assert_eq!(fx.tree.index().len(), 5);
    fx.tree.check_invariants().unwrap();
}

#[test]
fn test_veto_leaves_tree_untouched() {
    let mut fx = matching_fixture();
    let (f_2, _) = fx.files[0];
    fx.tree.set_fsid(f_2, Some(FsId(42))).unwrap();

    let veto = |_: &LocalTree, _: &str| false;
    assert!(!assign_filesystem_ids(&mut fx.tree, &veto, &fx.fs, DEBRIS, "/", false));

    let reconciler = Reconciler::new(config(false));
    let mut rx = reconciler.subscribe();
    let err = reconciler.assign(&mut fx.tree, &veto, &fx.fs).unwrap_err();
    assert!(matches!(err, ReconcileError::Vetoed { .. }));
    assert_eq!(rx.try_recv().unwrap().state, PassState::Aborted);

    assert_eq!(fx.tree.index().len(), 1);
    assert_eq!(fx.tree.lookup_fsid(FsId(42)), Some(f_2));
}

#[test]
fn test_root_scan_failure() {
    let mut fx = matching_fixture();
    fx.fs.set_unreadable("d", true);

    let err = Reconciler::new(config(false))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap_err();

    assert!(matches!(err, ReconcileError::RootScan { .. }));
    assert!(fx.tree.index().is_empty());
}

#[test]
fn test_debris_is_never_matched() {
    let mut fs = MemoryFs::default();
    fs.add_dir("d");
    fs.add_dir("d/.debris");
    fs.add_file("d/.debris/old.txt", "old", 1);
    fs.add_dir("d/.debrisbar");
    fs.add_file("d/.debrisbar/keep.txt", "keep", 2);

    // Tracked nodes mirroring the debris folder, as if it had been tracked.
    let mut tree = LocalTree::new("d");
    let root = tree.root();
    let debris = folder(&mut tree, root, ".debris");
    let old = file(&mut tree, &fs, debris, "old.txt");
    let bar = folder(&mut tree, root, ".debrisbar");
    let keep = file(&mut tree, &fs, bar, "keep.txt");
    assert!(tree.get(old).unwrap().fingerprint().is_some());

    let report = Reconciler::new(config(true))
        .assign(&mut tree, &AllowAll, &fs)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.debris_skipped, 1);
    assert_eq!(report.dirs_scanned, 2);
    assert_eq!(tree.get(old).unwrap().fsid(), None);
    assert_eq!(tree.get(keep).unwrap().fsid(), fs.fsid("d/.debrisbar/keep.txt"));
    assert_eq!(tree.index().len(), 1);
}

#[test]
fn test_unreadable_subtree_is_skipped() {
    let mut fx = matching_fixture();
    let before = fx.tree.clone();
    fx.fs.set_unreadable("d/d_1", true);

    let report = Reconciler::new(config(false))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.state, PassState::Done);
    assert_eq!(report.skipped_subtrees, 1);
    assert_eq!(report.warnings[0].kind, WarningKind::SubtreeSkipped);
    assert_eq!(report.ids_assigned, 3);
    assert_eq!(fx.tree.index().len(), 3);

    // Nodes below the unreadable folder keep their previous state.
    let d_1 = fx.tree.child(fx.tree.root(), "d_1").unwrap();
    for id in fx.tree.descendants(d_1) {
        assert_eq!(fx.tree.get(id).unwrap().fsid(), before.get(id).unwrap().fsid());
    }

    let mut strict_fx = matching_fixture();
    strict_fx.fs.set_unreadable("d/d_1", true);
    assert!(!assign_filesystem_ids(
        &mut strict_fx.tree,
        &AllowAll,
        &strict_fx.fs,
        DEBRIS,
        "/",
        true
    ));
    assert_eq!(strict_fx.tree.index().len(), 3);
}

#[test]
fn test_unreadable_file_keeps_previous_id() {
    let mut fx = matching_fixture();
    let (f_2, path) = fx.files[0];
    fx.tree.set_fsid(f_2, Some(FsId(500))).unwrap();
    fx.fs.set_unreadable(path, true);

    let report = Reconciler::new(config(false))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.unreadable_files, 1);
    assert_eq!(report.scan_errors(), 1);
    assert_eq!(report.ids_assigned, 4);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::PermissionDenied);
    assert_eq!(fx.tree.get(f_2).unwrap().fsid(), Some(FsId(500)));
    assert_eq!(fx.tree.lookup_fsid(FsId(500)), Some(f_2));
    fx.tree.check_invariants().unwrap();

    let mut strict_fx = matching_fixture();
    let (f_2, path) = strict_fx.files[0];
    strict_fx.tree.set_fsid(f_2, Some(FsId(500))).unwrap();
    strict_fx.fs.set_unreadable(path, true);
    assert!(!assign_filesystem_ids(
        &mut strict_fx.tree,
        &AllowAll,
        &strict_fx.fs,
        DEBRIS,
        "/",
        true
    ));
    assert_eq!(strict_fx.tree.get(f_2).unwrap().fsid(), Some(FsId(500)));
    assert_eq!(strict_fx.tree.index().len(), 5);
}

#[test]
fn test_missing_directory_is_skipped() {
    let mut fx = matching_fixture();
    fx.fs.remove("d/d_0");

    let report = Reconciler::new(config(false))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    // A vanished folder is simply not listed any more.
    assert!(report.success);
    assert_eq!(report.skipped_subtrees, 0);
    assert_eq!(report.ids_assigned, 3);
}

#[test]
fn test_changed_files_stay_undefined() {
    let mut fx = matching_fixture();
    assert!(assign_filesystem_ids(&mut fx.tree, &AllowAll, &fx.fs, DEBRIS, "/", true));

    fx.fs.write("d/d_0/f_0_0", "edited", 1_700_000_000);
    let report = Reconciler::new(config(true))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    let (f_0_0, _) = fx.files[1];
    assert!(report.success);
    assert_eq!(report.identity_mismatches, 1);
    assert_eq!(fx.tree.get(f_0_0).unwrap().fsid(), None);
    assert_eq!(fx.tree.index().len(), 4);
    fx.tree.check_invariants().unwrap();
}

#[test]
fn test_kind_change_clears_file_id() {
    let mut fx = matching_fixture();
    assert!(assign_filesystem_ids(&mut fx.tree, &AllowAll, &fx.fs, DEBRIS, "/", true));

    fx.fs.remove("d/f_2");
    fx.fs.add_dir("d/f_2");
    let report = Reconciler::new(config(true))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    let (f_2, _) = fx.files[0];
    assert_eq!(report.identity_mismatches, 1);
    assert_eq!(fx.tree.get(f_2).unwrap().fsid(), None);
}

#[test]
fn test_duplicate_ids_are_reported_not_overwritten() {
    let mut fx = matching_fixture();
    // Two entries sharing one id, like hard links.
    let shared = fx.fs.fsid("d/f_2").unwrap();
    fx.fs.set_fsid("d/d_0/f_0_0", shared);

    let report = Reconciler::new(config(true))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.duplicate_ids, 1);
    assert_eq!(report.ids_assigned, 4);
    assert!(report.warnings.iter().any(|w| w.kind == WarningKind::DuplicateId));

    let owner = fx.tree.lookup_fsid(shared).unwrap();
    let (f_2, _) = fx.files[0];
    let (f_0_0, _) = fx.files[1];
    assert!(owner == f_2 || owner == f_0_0);
    let loser = if owner == f_2 { f_0_0 } else { f_2 };
    assert_eq!(fx.tree.get(loser).unwrap().fsid(), None);
    fx.tree.check_invariants().unwrap();
}

#[test]
fn test_untracked_entries_are_left_alone() {
    let mut fx = matching_fixture();
    fx.fs.add_file("d/new.txt", "new", 5);
    fx.fs.add_dir("d/new_dir");

    let report = Reconciler::new(config(true))
        .assign(&mut fx.tree, &AllowAll, &fx.fs)
        .unwrap();

    assert_eq!(report.untracked, 2);
    assert_eq!(fx.tree.child(fx.tree.root(), "new.txt"), None);
    assert_eq!(fx.tree.index().len(), 5);
}

#[test]
fn test_rename_detected_through_index() {
    let mut fx = matching_fixture();
    let reconciler = Reconciler::new(config(true));
    reconciler.assign(&mut fx.tree, &AllowAll, &fx.fs).unwrap();

    let (f_0_1, _) = fx.files[2];
    assert!(fx.fs.rename("d/d_0/f_0_1", "d/d_1/renamed"));

    let moved_id = fx.fs.fsid("d/d_1/renamed").unwrap();
    assert_eq!(reconciler.find_moved(&fx.tree, moved_id), Some(f_0_1));
}

#[test]
fn test_tracked_snapshot_round_trip() {
    let fx = matching_fixture();
    let mut snapshot = track(&fx.fs, "d", &config(false)).unwrap();
    assert_eq!(snapshot.files, 5);

    let root = snapshot.tree.root();
    invalidate_filesystem_ids(&mut snapshot.tree, root);
    let report = Reconciler::new(config(true))
        .assign(&mut snapshot.tree, &AllowAll, &fx.fs)
        .unwrap();

    assert_eq!(report.ids_assigned, 5);
    assert_eq!(report.dirs_scanned, 4);
    snapshot.tree.check_invariants().unwrap();
}

#[cfg(unix)]
#[test]
fn test_assign_on_real_filesystem() {
    use std::fs;
    use syncid_scan::LocalFsAccess;
    use tempfile::TempDir;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("docs")).unwrap();
    fs::create_dir(root.join(".debris")).unwrap();
    fs::write(root.join("docs/a.txt"), "a").unwrap();
    fs::write(root.join("b.txt"), "b").unwrap();
    fs::write(root.join(".debris/c.txt"), "c").unwrap();

    let root_path = root.to_str().unwrap();
    let config = ReconcileConfig::builder()
        .debris_path(format!("{root_path}/.debris"))
        .separator("/")
        .build()
        .unwrap();
    let access = LocalFsAccess::new();
    let mut snapshot = track(&access, root_path, &config).unwrap();

    let report = Reconciler::new(config)
        .assign(&mut snapshot.tree, &AllowAll, &access)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.ids_assigned, 2);
    assert_eq!(report.debris_skipped, 1);
    snapshot.tree.check_invariants().unwrap();
}

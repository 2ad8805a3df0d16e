//! Invalidation and assignment of filesystem ids.
//!
//! An assignment pass walks the tracked tree and the real filesystem
//! together, depth-first, one directory at a time. A tracked file gets the
//! id of its on-disk counterpart only when the on-disk fingerprint matches
//! the stored one; folders never receive ids here.

use std::time::Instant;

use tokio::sync::broadcast;

use syncid_core::{
    FsId, LocalTree, NodeId, NodeKind, ReconcileConfig, ScanWarning, TreeError, join,
};
use syncid_scan::{DirEntry, EntryKind, FsAccess, fingerprint};

use crate::error::ReconcileError;
use crate::policy::SyncPolicy;
use crate::progress::{PassState, ReconcileProgress};
use crate::report::ReconcileReport;

/// Reset the fsid of `subtree` and every node below it.
///
/// Pure in-memory operation; afterwards the index holds no entry for any
/// node of the subtree. Returns the number of ids that were cleared.
pub fn invalidate_filesystem_ids(tree: &mut LocalTree, subtree: NodeId) -> usize {
    let mut cleared = 0;
    for id in tree.descendants(subtree) {
        let had_fsid = tree.get(id).and_then(|node| node.fsid()).is_some();
        if had_fsid && tree.clear_fsid(id).is_ok() {
            cleared += 1;
        }
    }
    tracing::debug!(cleared, "invalidated filesystem ids");
    cleared
}

/// Run one assignment pass with an ad hoc configuration.
///
/// Returns `false` when the root was vetoed or could not be opened, and, in
/// `strict` mode, when any directory or file below the root could not be
/// read.
pub fn assign_filesystem_ids(
    tree: &mut LocalTree,
    policy: &dyn SyncPolicy,
    fs: &dyn FsAccess,
    debris_path: &str,
    separator: &str,
    strict: bool,
) -> bool {
    let config = ReconcileConfig {
        debris_path: debris_path.to_string(),
        separator: separator.to_string(),
        strict,
        progress_interval: 0,
    };
    Reconciler::new(config)
        .assign(tree, policy, fs)
        .is_ok_and(|report| report.success)
}

/// Reconciliation engine with progress reporting.
pub struct Reconciler {
    config: ReconcileConfig,
    progress_tx: broadcast::Sender<ReconcileProgress>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(config: ReconcileConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            progress_tx,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Subscribe to pass progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileProgress> {
        self.progress_tx.subscribe()
    }

    /// Reset every fsid in `subtree`. See [`invalidate_filesystem_ids`].
    pub fn invalidate(&self, tree: &mut LocalTree, subtree: NodeId) -> usize {
        invalidate_filesystem_ids(tree, subtree)
    }

    /// Tracked node currently claiming an on-disk id.
    ///
    /// After a pass, an on-disk file found under a new name whose id resolves
    /// here is the same object as that node: a rename or a move.
    pub fn find_moved(&self, tree: &LocalTree, fsid: FsId) -> Option<NodeId> {
        tree.lookup_fsid(fsid)
    }

    /// Assign on-disk ids to every tracked file that still matches its
    /// on-disk counterpart.
    ///
    /// Fails only if `policy` vetoes the root or the root directory cannot
    /// be opened; in both cases the tree is left untouched. Everything
    /// below the root is absorbed into the report.
    pub fn assign(
        &self,
        tree: &mut LocalTree,
        policy: &dyn SyncPolicy,
        fs: &dyn FsAccess,
    ) -> Result<ReconcileReport, ReconcileError> {
        let root_path = tree.root_path().to_string();
        let span = tracing::info_span!("assign_fsids", root = %root_path);
        let _enter = span.enter();

        let mut pass = Pass {
            config: &self.config,
            progress_tx: &self.progress_tx,
            fs,
            start: Instant::now(),
            report: ReconcileReport::new(&root_path),
        };

        if !policy.may_sync(tree, &root_path) {
            tracing::warn!("root vetoed by sync policy");
            pass.transition(PassState::Aborted, &root_path);
            return Err(ReconcileError::Vetoed { root: root_path });
        }

        pass.transition(PassState::ScanningRoot, &root_path);
        let entries = match fs.open_dir(&root_path) {
            Ok(entries) => entries,
            Err(source) => {
                tracing::warn!(error = %source, "cannot open root");
                pass.transition(PassState::Aborted, &root_path);
                return Err(ReconcileError::RootScan {
                    root: root_path,
                    source,
                });
            }
        };
        pass.report.dirs_scanned += 1;

        let root = tree.root();
        let mut stack = Vec::new();
        pass.visit_all(tree, root, &root_path, entries, &mut stack);
        while let Some((dir, dir_path)) = stack.pop() {
            if let Some(entries) = pass.open_subtree(&dir_path) {
                pass.visit_all(tree, dir, &dir_path, entries, &mut stack);
            }
        }

        Ok(pass.finish(&root_path))
    }
}

/// State of one running pass.
struct Pass<'a> {
    config: &'a ReconcileConfig,
    progress_tx: &'a broadcast::Sender<ReconcileProgress>,
    fs: &'a dyn FsAccess,
    start: Instant,
    report: ReconcileReport,
}

impl Pass<'_> {
    /// Handle the listing of `dir`, queueing tracked subfolders so they are
    /// descended into in listing order.
    fn visit_all(
        &mut self,
        tree: &mut LocalTree,
        dir: NodeId,
        dir_path: &str,
        entries: Vec<DirEntry>,
        stack: &mut Vec<(NodeId, String)>,
    ) {
        let first = stack.len();
        for entry in entries {
            if let Some(next) = self.visit(tree, dir, dir_path, entry) {
                stack.push(next);
            }
        }
        stack[first..].reverse();
    }

    /// Open a tracked folder on descent. Failures skip the subtree.
    fn open_subtree(&mut self, path: &str) -> Option<Vec<DirEntry>> {
        if self.report.state == PassState::ScanningRoot {
            self.transition(PassState::ScanningSubtree, path);
        }
        match self.fs.open_dir(path) {
            Ok(entries) => {
                self.report.dirs_scanned += 1;
                tracing::debug!(path = %path, entries = entries.len(), "scanning folder");
                Some(entries)
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "subtree skipped");
                self.report.skipped_subtrees += 1;
                self.report
                    .warnings
                    .push(ScanWarning::subtree_skipped(path, &err));
                None
            }
        }
    }

    /// Handle one on-disk entry of `dir`, returning a folder to descend into.
    fn visit(
        &mut self,
        tree: &mut LocalTree,
        dir: NodeId,
        dir_path: &str,
        entry: DirEntry,
    ) -> Option<(NodeId, String)> {
        let path = join(dir_path, &entry.name, &self.config.separator);
        if !self.config.is_syncable(&path) {
            tracing::trace!(path = %path, "skipping debris");
            self.report.debris_skipped += 1;
            return None;
        }

        let Some(child) = tree.child(dir, &entry.name) else {
            self.report.untracked += 1;
            return None;
        };
        let child_kind = tree.get(child)?.kind();

        match (entry.kind, child_kind) {
            (EntryKind::Folder, NodeKind::Folder) => Some((child, path)),
            (EntryKind::File, NodeKind::File) => {
                self.check_file(tree, child, &path);
                None
            }
            (_, NodeKind::File) => {
                // Same name, different kind: the tracked file is gone.
                self.clear(tree, child, &path);
                self.report.identity_mismatches += 1;
                None
            }
            _ => {
                self.report.untracked += 1;
                None
            }
        }
    }

    fn check_file(&mut self, tree: &mut LocalTree, node: NodeId, path: &str) {
        self.report.files_checked += 1;
        self.maybe_report_progress(path);

        let opened = self.fs.open_file(path).and_then(|mut file| {
            let info = *file.info();
            if info.kind != EntryKind::File {
                return Ok((info, None));
            }
            fingerprint(file.as_mut()).map(|fp| (info, Some(fp)))
        });
        let (info, on_disk) = match opened {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "cannot read file");
                self.report.unreadable_files += 1;
                self.report.warnings.push(ScanWarning::from_error(path, &err));
                return;
            }
        };

        let stored = tree.get(node).and_then(|n| n.fingerprint().copied());
        let matches = on_disk.is_some() && on_disk == stored;
        if !matches {
            tracing::trace!(path = %path, "fingerprint mismatch");
            self.clear(tree, node, path);
            self.report.identity_mismatches += 1;
            return;
        }

        let Some(fsid) = info.fsid else {
            self.clear(tree, node, path);
            self.report.missing_ids += 1;
            return;
        };

        match tree.set_fsid(node, Some(fsid)) {
            Ok(()) => {
                tracing::trace!(path = %path, fsid = %fsid, "assigned filesystem id");
                self.report.ids_assigned += 1;
            }
            Err(TreeError::DuplicateId { existing, .. }) => {
                let existing_path = tree.path(existing, &self.config.separator);
                tracing::warn!(
                    path = %path,
                    fsid = %fsid,
                    claimed_by = ?existing_path,
                    "filesystem id already claimed"
                );
                self.clear(tree, node, path);
                self.report.duplicate_ids += 1;
                self.report
                    .warnings
                    .push(ScanWarning::duplicate_id(path, fsid));
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "cannot assign filesystem id");
            }
        }
    }

    fn clear(&self, tree: &mut LocalTree, node: NodeId, path: &str) {
        if let Err(err) = tree.clear_fsid(node) {
            tracing::warn!(path = %path, error = %err, "cannot clear filesystem id");
        }
    }

    fn transition(&mut self, state: PassState, path: &str) {
        if self.report.state.is_finished() {
            tracing::warn!(from = ?self.report.state, to = ?state, "pass already finished");
            return;
        }
        tracing::debug!(from = ?self.report.state, to = ?state, "pass state");
        self.report.state = state;
        self.send_progress(path);
    }

    fn maybe_report_progress(&self, path: &str) {
        let interval = self.config.progress_interval;
        if interval > 0 && self.report.files_checked % interval == 0 {
            self.send_progress(path);
        }
    }

    fn progress(&self, path: &str) -> ReconcileProgress {
        ReconcileProgress {
            state: self.report.state,
            dirs_scanned: self.report.dirs_scanned,
            files_checked: self.report.files_checked,
            ids_assigned: self.report.ids_assigned,
            current_path: path.to_string(),
            elapsed: self.start.elapsed(),
        }
    }

    fn send_progress(&self, path: &str) {
        // No subscribers is not an error.
        let _ = self.progress_tx.send(self.progress(path));
    }

    fn finish(mut self, root_path: &str) -> ReconcileReport {
        self.report.success = !(self.config.strict && self.report.scan_errors() > 0);
        self.report.duration = self.start.elapsed();
        self.transition(PassState::Done, root_path);

        let rate = self.progress(root_path).files_per_second();
        tracing::info!(
            success = self.report.success,
            dirs = self.report.dirs_scanned,
            files = self.report.files_checked,
            assigned = self.report.ids_assigned,
            mismatched = self.report.identity_mismatches,
            skipped_subtrees = self.report.skipped_subtrees,
            duplicates = self.report.duplicate_ids,
            files_per_second = rate,
            "assignment pass finished"
        );
        self.report
    }
}

//! Building a tracked tree from a directory.
//!
//! This is the "first seen" step the sync engine performs before any
//! reconciliation: every syncable file and folder under the root becomes a
//! node, files carry their fingerprint, and no node has an fsid yet.

use std::time::{Duration, Instant};

use syncid_core::{LocalTree, NodeId, NodeKind, ReconcileConfig, ScanError, ScanWarning};

use crate::access::{EntryKind, FsAccess};
use crate::fingerprint::fingerprint;

/// Result of tracking a directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The tracked tree.
    pub tree: LocalTree,
    /// Number of tracked files.
    pub files: u64,
    /// Number of tracked folders, root excluded.
    pub folders: u64,
    /// Entries that could not be read and were left untracked.
    pub warnings: Vec<ScanWarning>,
    /// Time spent tracking.
    pub duration: Duration,
}

/// Track every syncable entry below `root_path`.
///
/// Only a failure to open the root itself is an error; unreadable entries
/// further down are reported as warnings and left out of the tree.
pub fn track(
    fs: &dyn FsAccess,
    root_path: &str,
    config: &ReconcileConfig,
) -> Result<Snapshot, ScanError> {
    let start = Instant::now();
    let root_entries = fs.open_dir(root_path)?;

    let mut tree = LocalTree::new(root_path);
    let mut warnings = Vec::new();
    let mut files = 0;
    let mut folders = 0;

    let mut stack: Vec<(NodeId, String, Vec<_>)> =
        vec![(tree.root(), root_path.to_string(), root_entries)];

    while let Some((dir, dir_path, entries)) = stack.pop() {
        for entry in entries {
            let path = syncid_core::join(&dir_path, &entry.name, &config.separator);
            if !config.is_syncable(&path) {
                continue;
            }

            match entry.kind {
                EntryKind::Folder => {
                    let children = match fs.open_dir(&path) {
                        Ok(children) => children,
                        Err(err) => {
                            tracing::warn!(path = %path, error = %err, "folder not tracked");
                            warnings.push(ScanWarning::from_error(&path, &err));
                            continue;
                        }
                    };
                    let node = add(&mut tree, dir, &entry.name, NodeKind::Folder)?;
                    folders += 1;
                    stack.push((node, path, children));
                }
                EntryKind::File => {
                    let fp = fs
                        .open_file(&path)
                        .and_then(|mut file| fingerprint(file.as_mut()));
                    match fp {
                        Ok(fp) => {
                            let node = add(&mut tree, dir, &entry.name, NodeKind::File)?;
                            tree.set_fingerprint(node, Some(fp))
                                .map_err(|e| ScanError::Other {
                                    message: e.to_string(),
                                })?;
                            files += 1;
                        }
                        Err(err) => {
                            tracing::warn!(path = %path, error = %err, "file not tracked");
                            warnings.push(ScanWarning::from_error(&path, &err));
                        }
                    }
                }
                EntryKind::Other => {}
            }
        }
    }

    tracing::debug!(root = root_path, files, folders, "tracked directory");

    Ok(Snapshot {
        tree,
        files,
        folders,
        warnings,
        duration: start.elapsed(),
    })
}

fn add(tree: &mut LocalTree, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId, ScanError> {
    tree.add_child(parent, name, kind)
        .map_err(|e| ScanError::Other {
            message: e.to_string(),
        })
}

//! Filesystem-id reconciliation for syncid.
//!
//! Keeps the platform filesystem id of every tracked file consistent with
//! the real filesystem so renames and moves can be detected without
//! recomputing content identity on every pass.
//!
//! A pass is normally driven in two steps:
//!
//! 1. [`invalidate_filesystem_ids`] drops every id in a subtree
//! 2. [`Reconciler::assign`] walks the tree and the filesystem together and
//!    reassigns ids to files whose fingerprint still matches
//!
//! # Example
//!
//! ```rust
//! use syncid_core::{LocalTree, NodeKind};
//! use syncid_reconcile::{AllowAll, assign_filesystem_ids, invalidate_filesystem_ids};
//! use syncid_scan::MemoryFs;
//!
//! let mut fs = MemoryFs::default();
//! fs.add_dir("d");
//! fs.add_file("d/a.txt", "alpha", 1_700_000_000);
//!
//! let mut tree = LocalTree::new("d");
//! let a = tree.add_child(tree.root(), "a.txt", NodeKind::File).unwrap();
//! tree.set_fingerprint(a, fs.fingerprint("d/a.txt")).unwrap();
//!
//! let root = tree.root();
//! invalidate_filesystem_ids(&mut tree, root);
//! assert!(assign_filesystem_ids(&mut tree, &AllowAll, &fs, "d/.debris", "/", false));
//! assert_eq!(tree.get(a).unwrap().fsid(), fs.fsid("d/a.txt"));
//! ```

mod engine;
mod error;
mod policy;
mod progress;
mod report;

pub use engine::{Reconciler, assign_filesystem_ids, invalidate_filesystem_ids};
pub use error::ReconcileError;
pub use policy::{AllowAll, SyncPolicy};
pub use progress::{PassState, ReconcileProgress};
pub use report::ReconcileReport;

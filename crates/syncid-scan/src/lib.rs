//! Filesystem scanning capability for syncid.
//!
//! Reconciliation never touches the filesystem directly; it goes through the
//! [`FsAccess`] capability defined here. Two implementations are provided:
//!
//! - [`LocalFsAccess`] for the real filesystem (jwalk listings, inode ids)
//! - [`MemoryFs`], a deterministic in-memory filesystem for tests and dry runs
//!
//! # Example
//!
//! ```rust
//! use syncid_scan::{MemoryFs, ReconcileConfig, track};
//!
//! let mut fs = MemoryFs::default();
//! fs.add_dir("d");
//! fs.add_file("d/notes.txt", "hello", 1_700_000_000);
//!
//! let config = ReconcileConfig::builder()
//!     .debris_path("d/.debris")
//!     .separator("/")
//!     .build()
//!     .unwrap();
//! let snapshot = track(&fs, "d", &config).unwrap();
//! assert_eq!(snapshot.files, 1);
//! ```

mod access;
mod fingerprint;
mod local;
mod memory;
mod track;

pub use access::{DirEntry, EntryKind, FileAccess, FileInfo, FsAccess};
pub use fingerprint::{FULL_HASH_LIMIT, SAMPLE_SIZE, fingerprint};
pub use local::LocalFsAccess;
pub use memory::MemoryFs;
pub use track::{Snapshot, track};

// Re-export core types for convenience
pub use syncid_core::{
    Fingerprint, FsId, LocalTree, NodeId, NodeKind, ReconcileConfig, ScanError, ScanWarning,
    WarningKind,
};

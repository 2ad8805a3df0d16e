//! Filesystem access capability consumed by tracking and reconciliation.

use syncid_core::{FsId, NodeKind, ScanError};

/// Type of an on-disk entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Folder,
    /// Anything else (symlinks not followed, sockets, devices...).
    Other,
}

impl EntryKind {
    /// Tracked node kind matching this entry, if it can be tracked at all.
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            EntryKind::File => Some(NodeKind::File),
            EntryKind::Folder => Some(NodeKind::Folder),
            EntryKind::Other => None,
        }
    }
}

/// One immediate child of an opened directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Metadata of an opened file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Platform filesystem id, if the platform provides one.
    pub fsid: Option<FsId>,
    /// Size in bytes.
    pub size: u64,
    /// Modification time, unix seconds.
    pub mtime: i64,
    /// Entry type.
    pub kind: EntryKind,
}

/// An opened file.
pub trait FileAccess {
    /// Metadata captured when the file was opened.
    fn info(&self) -> &FileInfo;

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails if fewer than `buf.len()` bytes are available.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ScanError>;
}

/// Directory and file access, one call at a time.
///
/// Every call reports its own success or failure; callers decide whether a
/// failure is fatal.
pub trait FsAccess {
    /// Enumerate the immediate children of the directory at `path`.
    fn open_dir(&self, path: &str) -> Result<Vec<DirEntry>, ScanError>;

    /// Open the entry at `path` for metadata and raw reads.
    fn open_file<'a>(&'a self, path: &str) -> Result<Box<dyn FileAccess + 'a>, ScanError>;
}

//! Local node types.

use std::collections::BTreeMap;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`LocalTree`](crate::LocalTree) arena.
///
/// The generation guards against stale handles: once a slot is freed and
/// reused, handles to the previous occupant no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Arena slot of this handle.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Platform-assigned filesystem identifier (the inode number on unix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FsId(pub u64);

impl FsId {
    /// Create a new FsId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sparse content check value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckValue(pub [u8; 16]);

impl CheckValue {
    /// Create a new CheckValue from raw bytes.
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the check value as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Content-identity signature of a file.
///
/// Two files with equal fingerprints are treated as the same managed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Size in bytes.
    pub size: u64,
    /// Modification time, unix seconds.
    pub mtime: i64,
    /// Sparse content check value.
    pub check: CheckValue,
}

impl Fingerprint {
    /// Create a new fingerprint.
    pub fn new(size: u64, mtime: i64, check: CheckValue) -> Self {
        Self { size, mtime, check }
    }
}

/// Type of a tracked entry. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Folder,
}

impl NodeKind {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }
}

/// A single tracked file or folder.
///
/// Nodes live in the [`LocalTree`](crate::LocalTree) arena; `parent` and
/// `children` are handles into that arena. The fsid and its index slot are
/// only mutated through the tree, which keeps them consistent with the
/// [`FsIdIndex`](crate::FsIdIndex).
#[derive(Debug, Clone)]
pub struct LocalNode {
    pub(crate) name: CompactString,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: BTreeMap<CompactString, NodeId>,
    pub(crate) fsid: Option<FsId>,
    pub(crate) fsid_slot: Option<usize>,
    pub(crate) fingerprint: Option<Fingerprint>,
}

impl LocalNode {
    pub(crate) fn new(name: CompactString, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            name,
            kind,
            parent,
            children: BTreeMap::new(),
            fsid: None,
            fsid_slot: None,
            fingerprint: None,
        }
    }

    /// Entry name (not full path). For the root this is its full path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Parent handle, `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Current filesystem id, `None` when undefined.
    pub fn fsid(&self) -> Option<FsId> {
        self.fsid
    }

    /// Position of this node's entry in the fsid index, if indexed.
    pub fn fsid_slot(&self) -> Option<usize> {
        self.fsid_slot
    }

    /// Stored content fingerprint (files only).
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// Check if this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Check if this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Child handle by name.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Children in name order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

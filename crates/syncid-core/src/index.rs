//! Filesystem-id index.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::node::{FsId, NodeId};

/// Non-owning map from filesystem id to the node currently claiming it.
///
/// Entries occupy dense slots; a node remembers its slot so removal is
/// O(1). Removing a slot moves the last entry into the gap, and the caller
/// is told which node moved so it can update its slot.
///
/// Mutation is crate-private: only [`LocalTree`](crate::LocalTree) changes
/// the index, together with the node's own fsid.
#[derive(Debug, Clone, Default)]
pub struct FsIdIndex {
    entries: IndexMap<FsId, NodeId>,
}

impl FsIdIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Node currently claiming `fsid`.
    pub fn lookup(&self, fsid: FsId) -> Option<NodeId> {
        self.entries.get(&fsid).copied()
    }

    /// Slot of the entry for `fsid`.
    pub fn slot_of(&self, fsid: FsId) -> Option<usize> {
        self.entries.get_index_of(&fsid)
    }

    /// Entry stored at `slot`.
    pub fn get_slot(&self, slot: usize) -> Option<(FsId, NodeId)> {
        self.entries.get_index(slot).map(|(fsid, node)| (*fsid, *node))
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no node is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (FsId, NodeId)> + '_ {
        self.entries.iter().map(|(fsid, node)| (*fsid, *node))
    }

    /// Insert a new entry, returning its slot.
    ///
    /// An existing entry is never overwritten; its owner is returned instead.
    pub(crate) fn insert(&mut self, fsid: FsId, node: NodeId) -> Result<usize, NodeId> {
        match self.entries.entry(fsid) {
            Entry::Occupied(occupied) => Err(*occupied.get()),
            Entry::Vacant(vacant) => {
                let slot = vacant.index();
                vacant.insert(node);
                Ok(slot)
            }
        }
    }

    /// Remove the entry at `slot`.
    ///
    /// Returns the removed entry and, if another entry was moved into the
    /// freed slot, the node that moved.
    pub(crate) fn remove_slot(&mut self, slot: usize) -> Option<((FsId, NodeId), Option<NodeId>)> {
        let removed = self.entries.swap_remove_index(slot)?;
        let moved = self.entries.get_index(slot).map(|(_, node)| *node);
        Some((removed, moved))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Arena-backed tree of tracked local entries.

use compact_str::CompactString;

use crate::error::TreeError;
use crate::index::FsIdIndex;
use crate::node::{Fingerprint, FsId, LocalNode, NodeId, NodeKind};
use crate::path::join;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<LocalNode>,
}

/// Tree of tracked entries mirroring a watched directory.
///
/// Nodes are owned by a generational arena; parents hold child handles and
/// children hold a plain handle back to their parent. The tree also owns
/// the [`FsIdIndex`] so a node's fsid and its index entry always change
/// together.
#[derive(Debug, Clone)]
pub struct LocalTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
    index: FsIdIndex,
}

impl LocalTree {
    /// Create a tree whose root folder is the directory at `root_path`.
    pub fn new(root_path: impl Into<CompactString>) -> Self {
        let root_node = LocalNode::new(root_path.into(), NodeKind::Folder, None);
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root_node),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            live: 1,
            index: FsIdIndex::new(),
        }
    }

    /// Handle of the root folder.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Absolute path of the watched directory.
    pub fn root_path(&self) -> &str {
        self.slots[0].node.as_ref().map(|n| n.name()).unwrap_or_default()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Read-only view of the fsid index.
    pub fn index(&self) -> &FsIdIndex {
        &self.index
    }

    /// Resolve a handle.
    pub fn get(&self, id: NodeId) -> Option<&LocalNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Resolve a handle, reporting stale handles as errors.
    pub fn node(&self, id: NodeId) -> Result<&LocalNode, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut LocalNode, TreeError> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(TreeError::UnknownNode(id))
    }

    /// Check whether a handle resolves to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Child of `parent` named `name`.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent).and_then(|node| node.child(name))
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Start tracking a new entry under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<CompactString>,
        kind: NodeKind,
    ) -> Result<NodeId, TreeError> {
        let name = name.into();
        let parent_node = self.node(parent)?;
        if !parent_node.is_folder() {
            return Err(TreeError::NotAFolder(parent));
        }
        if parent_node.children.contains_key(&name) {
            return Err(TreeError::NameTaken {
                name: name.to_string(),
            });
        }

        let node = LocalNode::new(name.clone(), kind, Some(parent));
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };

        self.node_mut(parent)?.children.insert(name, id);
        self.live += 1;
        Ok(id)
    }

    /// Store the content fingerprint of a file node.
    pub fn set_fingerprint(
        &mut self,
        id: NodeId,
        fingerprint: Option<Fingerprint>,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if !node.is_file() {
            return Err(TreeError::NotAFile(id));
        }
        node.fingerprint = fingerprint;
        Ok(())
    }

    /// Full path of `id`, built from the root path with `separator`.
    pub fn path(&self, id: NodeId, separator: &str) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur)?;
            names.push(node.name());
            current = node.parent;
        }

        let mut names = names.into_iter().rev();
        let mut path = names.next()?.to_string();
        for name in names {
            path = join(&path, name, separator);
        }
        Some(path)
    }

    /// `id` and all of its descendants, depth-first, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.get(cur) else {
                continue;
            };
            out.push(cur);
            stack.extend(node.children.values().rev());
        }
        out
    }

    /// Iterate over all live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &LocalNode)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    /// Node currently claiming `fsid`.
    pub fn lookup_fsid(&self, fsid: FsId) -> Option<NodeId> {
        self.index.lookup(fsid)
    }

    /// Change a node's fsid and its index entry in one step.
    ///
    /// The old entry (if any) is removed before the new one is inserted. If
    /// `fsid` is already claimed by a different node, nothing changes and
    /// [`TreeError::DuplicateId`] is returned.
    pub fn set_fsid(&mut self, id: NodeId, fsid: Option<FsId>) -> Result<(), TreeError> {
        let current = self.node(id)?.fsid;
        if current == fsid {
            return Ok(());
        }

        if let Some(new) = fsid
            && let Some(existing) = self.index.lookup(new)
            && existing != id
        {
            return Err(TreeError::DuplicateId {
                fsid: new,
                existing,
                incoming: id,
            });
        }

        self.unindex(id)?;

        if let Some(new) = fsid {
            let slot = self
                .index
                .insert(new, id)
                .map_err(|existing| TreeError::DuplicateId {
                    fsid: new,
                    existing,
                    incoming: id,
                })?;
            let node = self.node_mut(id)?;
            node.fsid = Some(new);
            node.fsid_slot = Some(slot);
        }
        Ok(())
    }

    /// Reset a node's fsid to undefined. Idempotent.
    pub fn clear_fsid(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.unindex(id)
    }

    fn unindex(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.fsid = None;
        let Some(slot) = node.fsid_slot.take() else {
            return Ok(());
        };

        if let Some((_, Some(moved))) = self.index.remove_slot(slot) {
            self.node_mut(moved)?.fsid_slot = Some(slot);
        }
        Ok(())
    }

    /// Reset every fsid in the tree and empty the index.
    pub fn clear_all_fsids(&mut self) {
        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                node.fsid = None;
                node.fsid_slot = None;
            }
        }
        self.index.clear();
    }

    /// Stop tracking `id` and everything below it.
    ///
    /// Index entries of removed nodes are purged and their arena slots freed;
    /// handles to them stop resolving. Returns the number of removed nodes.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, TreeError> {
        if id == self.root {
            return Err(TreeError::RootRemoval);
        }
        let node = self.node(id)?;
        let parent = node.parent;
        let name = node.name.clone();

        let doomed = self.descendants(id);
        for &cur in &doomed {
            self.unindex(cur)?;
        }
        for &cur in &doomed {
            let slot = &mut self.slots[cur.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(cur.index);
        }
        self.live -= doomed.len();

        if let Some(parent) = parent {
            self.node_mut(parent)?.children.remove(&name);
        }
        Ok(doomed.len())
    }

    /// Verify the structural and index invariants of the tree.
    ///
    /// Checks that every fsid is indexed at the slot the node records, that
    /// the index holds exactly the nodes with a defined fsid, and that
    /// parent and child handles agree.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut with_fsid = 0;
        for (id, node) in self.iter() {
            match (node.fsid, node.fsid_slot) {
                (None, None) => {}
                (Some(fsid), Some(slot)) => {
                    with_fsid += 1;
                    if self.index.get_slot(slot) != Some((fsid, id)) {
                        return Err(format!("{id:?}: slot {slot} does not hold fsid {fsid}"));
                    }
                }
                (fsid, slot) => {
                    return Err(format!("{id:?}: fsid {fsid:?} with slot {slot:?}"));
                }
            }

            for (name, child) in node.children() {
                let child_node = self
                    .get(child)
                    .ok_or_else(|| format!("{id:?}: dangling child {name}"))?;
                if child_node.parent != Some(id) || child_node.name() != name {
                    return Err(format!("{child:?}: inconsistent back-reference"));
                }
            }
        }

        if with_fsid != self.index.len() {
            return Err(format!(
                "index holds {} entries, {with_fsid} nodes carry an fsid",
                self.index.len()
            ));
        }
        Ok(())
    }
}

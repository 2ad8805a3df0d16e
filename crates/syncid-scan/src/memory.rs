//! Deterministic in-memory filesystem.
//!
//! Used to drive tracking and reconciliation without touching the disk.
//! Paths are plain strings built with the filesystem's separator; any
//! folder added without a known parent acts as a root.

use std::collections::HashMap;

use syncid_core::{Fingerprint, FsId, ScanError};

use crate::access::{DirEntry, EntryKind, FileAccess, FileInfo, FsAccess};
use crate::fingerprint::fingerprint;

#[derive(Debug, Clone)]
enum Payload {
    Folder { children: Vec<String> },
    File { content: Vec<u8>, mtime: i64 },
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    fsid: FsId,
    unreadable: bool,
    payload: Payload,
}

/// In-memory [`FsAccess`] with sequentially assigned filesystem ids.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    separator: String,
    entries: HashMap<String, MemoryEntry>,
    next_fsid: u64,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryFs {
    /// Create an empty filesystem using `separator` between path components.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            entries: HashMap::new(),
            next_fsid: 1,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Add a folder, returning its filesystem id.
    pub fn add_dir(&mut self, path: &str) -> FsId {
        self.insert(
            path,
            Payload::Folder {
                children: Vec::new(),
            },
        )
    }

    /// Add a file, returning its filesystem id.
    pub fn add_file(&mut self, path: &str, content: impl Into<Vec<u8>>, mtime: i64) -> FsId {
        self.insert(
            path,
            Payload::File {
                content: content.into(),
                mtime,
            },
        )
    }

    fn insert(&mut self, path: &str, payload: Payload) -> FsId {
        let fsid = FsId::new(self.next_fsid);
        self.next_fsid += 1;

        if let Some(old) = self.entries.get(path).map(|e| e.fsid) {
            self.remove(path);
            tracing::trace!(path, old = %old, "replacing in-memory entry");
        }

        if let Some((parent, name)) = self.split(path)
            && let Some(MemoryEntry {
                payload: Payload::Folder { children },
                ..
            }) = self.entries.get_mut(parent)
        {
            children.push(name.to_string());
        }

        self.entries.insert(
            path.to_string(),
            MemoryEntry {
                fsid,
                unreadable: false,
                payload,
            },
        );
        fsid
    }

    fn split<'p>(&self, path: &'p str) -> Option<(&'p str, &'p str)> {
        path.rsplit_once(self.separator.as_str())
    }

    /// Filesystem id of the entry at `path`.
    pub fn fsid(&self, path: &str) -> Option<FsId> {
        self.entries.get(path).map(|e| e.fsid)
    }

    /// Override the filesystem id of an entry.
    pub fn set_fsid(&mut self, path: &str, fsid: FsId) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.fsid = fsid;
                true
            }
            None => false,
        }
    }

    /// Make an entry fail to open (simulates a permission error).
    pub fn set_unreadable(&mut self, path: &str, unreadable: bool) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.unreadable = unreadable;
                true
            }
            None => false,
        }
    }

    /// Replace a file's content and modification time, keeping its id.
    pub fn write(&mut self, path: &str, content: impl Into<Vec<u8>>, mtime: i64) -> bool {
        match self.entries.get_mut(path) {
            Some(MemoryEntry {
                payload: Payload::File { content: c, mtime: m },
                ..
            }) => {
                *c = content.into();
                *m = mtime;
                true
            }
            _ => false,
        }
    }

    /// Remove an entry and everything below it.
    pub fn remove(&mut self, path: &str) -> bool {
        let Some(entry) = self.entries.remove(path) else {
            return false;
        };
        if let Payload::Folder { children } = entry.payload {
            for child in children {
                let child_path = syncid_core::join(path, &child, &self.separator);
                self.remove(&child_path);
            }
        }
        if let Some((parent, name)) = self.split(path)
            && let Some(MemoryEntry {
                payload: Payload::Folder { children },
                ..
            }) = self.entries.get_mut(parent)
        {
            children.retain(|c| c != name);
        }
        true
    }

    /// Move an entry (and its subtree) to `to`, keeping every filesystem id.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if !self.entries.contains_key(from) || self.entries.contains_key(to) {
            return false;
        }

        let mut moved = Vec::new();
        self.detach(from, &mut moved);
        for (old_path, entry) in moved {
            let new_path = format!("{to}{}", &old_path[from.len()..]);
            self.entries.insert(new_path, entry);
        }

        if let Some((parent, name)) = self.split(to)
            && let Some(MemoryEntry {
                payload: Payload::Folder { children },
                ..
            }) = self.entries.get_mut(parent)
        {
            children.push(name.to_string());
        }
        true
    }

    fn detach(&mut self, path: &str, out: &mut Vec<(String, MemoryEntry)>) {
        if let Some((parent, name)) = self.split(path)
            && let Some(MemoryEntry {
                payload: Payload::Folder { children },
                ..
            }) = self.entries.get_mut(parent)
        {
            children.retain(|c| c != name);
        }

        let mut stack = vec![path.to_string()];
        while let Some(cur) = stack.pop() {
            let Some(entry) = self.entries.remove(&cur) else {
                continue;
            };
            if let Payload::Folder { children } = &entry.payload {
                for child in children {
                    stack.push(syncid_core::join(&cur, child, &self.separator));
                }
            }
            out.push((cur, entry));
        }
    }

    /// Fingerprint the file at `path` as the reconciler would see it.
    pub fn fingerprint(&self, path: &str) -> Option<Fingerprint> {
        let mut file = self.open_file(path).ok()?;
        if file.info().kind != EntryKind::File {
            return None;
        }
        fingerprint(file.as_mut()).ok()
    }

    fn readable(&self, path: &str) -> Result<&MemoryEntry, ScanError> {
        let entry = self.entries.get(path).ok_or_else(|| ScanError::NotFound {
            path: path.into(),
        })?;
        if entry.unreadable {
            return Err(ScanError::PermissionDenied { path: path.into() });
        }
        Ok(entry)
    }
}

impl FsAccess for MemoryFs {
    fn open_dir(&self, path: &str) -> Result<Vec<DirEntry>, ScanError> {
        let entry = self.readable(path)?;
        let Payload::Folder { children } = &entry.payload else {
            return Err(ScanError::NotADirectory { path: path.into() });
        };

        Ok(children
            .iter()
            .filter_map(|name| {
                let child = self
                    .entries
                    .get(&syncid_core::join(path, name, &self.separator))?;
                let kind = match child.payload {
                    Payload::Folder { .. } => EntryKind::Folder,
                    Payload::File { .. } => EntryKind::File,
                };
                Some(DirEntry::new(name.as_str(), kind))
            })
            .collect())
    }

    fn open_file<'a>(&'a self, path: &str) -> Result<Box<dyn FileAccess + 'a>, ScanError> {
        let entry = self.readable(path)?;
        let (content, info): (&[u8], FileInfo) = match &entry.payload {
            Payload::File { content, mtime } => (
                content.as_slice(),
                FileInfo {
                    fsid: Some(entry.fsid),
                    size: content.len() as u64,
                    mtime: *mtime,
                    kind: EntryKind::File,
                },
            ),
            Payload::Folder { .. } => (
                &[][..],
                FileInfo {
                    fsid: Some(entry.fsid),
                    size: 0,
                    mtime: 0,
                    kind: EntryKind::Folder,
                },
            ),
        };

        Ok(Box::new(MemoryFile {
            path: path.to_string(),
            content,
            info,
        }))
    }
}

struct MemoryFile<'a> {
    path: String,
    content: &'a [u8],
    info: FileInfo,
}

impl FileAccess for MemoryFile<'_> {
    fn info(&self) -> &FileInfo {
        &self.info
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ScanError> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.content.get(start..end))
            .ok_or_else(|| ScanError::Other {
                message: format!("Short read at {}", self.path),
            })?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

//! Access to the real local filesystem.

use std::fs::{File, Metadata};
use std::io::{Read, Seek, SeekFrom};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use chrono::{DateTime, Utc};
use jwalk::{Parallelism, WalkDir};

use syncid_core::{FsId, ScanError};

use crate::access::{DirEntry, EntryKind, FileAccess, FileInfo, FsAccess};

/// [`FsAccess`] backed by the local filesystem.
///
/// Directory listings go through jwalk in serial mode, one level at a time.
#[derive(Debug, Clone, Default)]
pub struct LocalFsAccess {
    follow_symlinks: bool,
}

impl LocalFsAccess {
    /// Create a new accessor that does not follow symbolic links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat symbolic links as the entries they point to.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    fn metadata(&self, path: &str) -> Result<Metadata, ScanError> {
        let metadata = if self.follow_symlinks {
            std::fs::metadata(path)
        } else {
            std::fs::symlink_metadata(path)
        };
        metadata.map_err(|e| ScanError::io(path, e))
    }
}

impl FsAccess for LocalFsAccess {
    fn open_dir(&self, path: &str) -> Result<Vec<DirEntry>, ScanError> {
        if !self.metadata(path)?.is_dir() {
            return Err(ScanError::NotADirectory { path: path.into() });
        }

        let walker = WalkDir::new(path)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(self.follow_symlinks)
            .sort(true)
            .min_depth(0)
            .max_depth(1);

        let mut entries = Vec::new();
        for entry_result in walker {
            let entry = entry_result.map_err(|err| {
                let kind = err
                    .io_error()
                    .map(|io| io.kind())
                    .unwrap_or(std::io::ErrorKind::Other);
                ScanError::io(path, std::io::Error::new(kind, err.to_string()))
            })?;
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Folder
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            entries.push(DirEntry::new(entry.file_name().to_string_lossy(), kind));
        }
        Ok(entries)
    }

    fn open_file<'a>(&'a self, path: &str) -> Result<Box<dyn FileAccess + 'a>, ScanError> {
        let metadata = self.metadata(path)?;
        let kind = entry_kind(&metadata);
        let file = if kind == EntryKind::File {
            Some(File::open(path).map_err(|e| ScanError::io(path, e))?)
        } else {
            None
        };

        let info = FileInfo {
            fsid: get_fsid(&metadata),
            size: if kind == EntryKind::File { metadata.len() } else { 0 },
            mtime: metadata
                .modified()
                .map(|t| DateTime::<Utc>::from(t).timestamp())
                .unwrap_or_default(),
            kind,
        };

        Ok(Box::new(LocalFile {
            path: path.to_string(),
            file,
            info,
        }))
    }
}

struct LocalFile {
    path: String,
    file: Option<File>,
    info: FileInfo,
}

impl FileAccess for LocalFile {
    fn info(&self) -> &FileInfo {
        &self.info
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ScanError> {
        let Some(file) = self.file.as_mut() else {
            return Err(ScanError::Other {
                message: format!("Not a regular file: {}", self.path),
            });
        };
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| ScanError::io(&self.path, e))?;
        file.read_exact(buf)
            .map_err(|e| ScanError::io(&self.path, e))
    }
}

fn entry_kind(metadata: &Metadata) -> EntryKind {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        EntryKind::Folder
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

/// Get the filesystem id (inode number) from metadata.
#[cfg(unix)]
fn get_fsid(metadata: &Metadata) -> Option<FsId> {
    Some(FsId::new(metadata.ino()))
}

#[cfg(not(unix))]
fn get_fsid(_metadata: &Metadata) -> Option<FsId> {
    None // No stable file id exposed through std here
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();

        temp
    }

    #[test]
    fn test_open_dir_lists_immediate_children() {
        let temp = create_test_tree();
        let access = LocalFsAccess::new();

        let entries = access.open_dir(temp.path().to_str().unwrap()).unwrap();

        assert_eq!(
            entries,
            vec![
                DirEntry::new("dir1", EntryKind::Folder),
                DirEntry::new("file1.txt", EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_open_dir_missing() {
        let temp = create_test_tree();
        let missing = temp.path().join("nope");
        let err = LocalFsAccess::new()
            .open_dir(missing.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn test_open_dir_on_file() {
        let temp = create_test_tree();
        let file = temp.path().join("file1.txt");
        let err = LocalFsAccess::new()
            .open_dir(file.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory { .. }));
    }

    #[test]
    fn test_open_file_reads_metadata_and_bytes() {
        let temp = create_test_tree();
        let access = LocalFsAccess::new();
        let path = temp.path().join("file1.txt");

        let mut file = access.open_file(path.to_str().unwrap()).unwrap();
        assert_eq!(file.info().kind, EntryKind::File);
        assert_eq!(file.info().size, 5);

        let mut buf = [0u8; 3];
        file.read_at(1, &mut buf).unwrap();
        assert_eq!(&buf, b"ell");

        let mut too_long = [0u8; 10];
        assert!(file.read_at(0, &mut too_long).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_fsid_is_inode_and_survives_rename() {
        let temp = create_test_tree();
        let access = LocalFsAccess::new();
        let before = temp.path().join("file1.txt");
        let after = temp.path().join("renamed.txt");

        let fsid = access
            .open_file(before.to_str().unwrap())
            .unwrap()
            .info()
            .fsid;
        fs::rename(&before, &after).unwrap();
        let moved = access.open_file(after.to_str().unwrap()).unwrap().info().fsid;

        assert!(fsid.is_some());
        assert_eq!(fsid, moved);
    }
}

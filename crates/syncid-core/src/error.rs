//! Error types for tree mutation and filesystem scanning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{FsId, NodeId};

/// Errors that can occur while opening or reading filesystem entries.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Path was expected to be a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Warning kind matching this error when it is absorbed mid-pass.
    pub fn warning_kind(&self) -> WarningKind {
        match self {
            Self::PermissionDenied { .. } => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        }
    }
}

/// Errors from mutating a [`LocalTree`](crate::LocalTree).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// Handle does not resolve to a live node.
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    /// Children can only be added to folders.
    #[error("Node {0:?} is not a folder")]
    NotAFolder(NodeId),

    /// Fingerprints are only stored on files.
    #[error("Node {0:?} is not a file")]
    NotAFile(NodeId),

    /// A sibling with the same name already exists.
    #[error("Name already taken: {name}")]
    NameTaken { name: String },

    /// The root node cannot be removed.
    #[error("The root node cannot be removed")]
    RootRemoval,

    /// Two live nodes claimed the same filesystem id.
    #[error("Filesystem id {fsid} already claimed by {existing:?}, refused for {incoming:?}")]
    DuplicateId {
        fsid: FsId,
        existing: NodeId,
        incoming: NodeId,
    },
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading file/directory.
    ReadError,
    /// On-disk id already claimed by another node.
    DuplicateId,
    /// A directory could not be opened and its subtree was left as is.
    SubtreeSkipped,
}

/// Non-fatal warning encountered during a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from an absorbed scan error.
    pub fn from_error(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        Self::new(path, error.to_string(), error.warning_kind())
    }

    /// Create a skipped-subtree warning.
    pub fn subtree_skipped(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        let path = path.into();
        Self {
            message: format!("Subtree skipped: {error}"),
            path,
            kind: WarningKind::SubtreeSkipped,
        }
    }

    /// Create a duplicate id warning.
    pub fn duplicate_id(path: impl Into<PathBuf>, fsid: FsId) -> Self {
        let path = path.into();
        Self {
            message: format!("Filesystem id {fsid} already claimed by another node"),
            path,
            kind: WarningKind::DuplicateId,
        }
    }
}

//! Core types for syncid.
//!
//! This crate provides the data structures shared by the scanning and
//! reconciliation crates: the arena-backed local node tree, the
//! filesystem-id index, fingerprints, the debris path classifier and the
//! reconcile configuration.

mod config;
mod error;
mod index;
mod node;
mod path;
mod tree;

pub use config::{DEFAULT_DEBRIS_NAME, ReconcileConfig, ReconcileConfigBuilder};
pub use error::{ScanError, ScanWarning, TreeError, WarningKind};
pub use index::FsIdIndex;
pub use node::{CheckValue, Fingerprint, FsId, LocalNode, NodeId, NodeKind};
pub use path::{is_syncable, join};
pub use tree::LocalTree;

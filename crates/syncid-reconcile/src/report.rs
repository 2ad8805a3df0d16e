//! Summary of a completed assignment pass.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use syncid_core::ScanWarning;

use crate::progress::PassState;

/// Counters and warnings collected during one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Root path of the pass.
    pub root: String,
    /// Final state of the pass.
    pub state: PassState,
    /// Overall result of the pass.
    pub success: bool,
    /// Directories opened, root included.
    pub dirs_scanned: u64,
    /// Tracked files compared against disk.
    pub files_checked: u64,
    /// Files whose on-disk id was assigned.
    pub ids_assigned: u64,
    /// Files whose on-disk fingerprint or kind disagreed with the tracked one.
    pub identity_mismatches: u64,
    /// Entries inside the debris area that were skipped.
    pub debris_skipped: u64,
    /// On-disk entries with no tracked counterpart.
    pub untracked: u64,
    /// Directories that could not be opened.
    pub skipped_subtrees: u64,
    /// Tracked files that could not be opened or read.
    pub unreadable_files: u64,
    /// Files whose platform exposes no filesystem id.
    pub missing_ids: u64,
    /// On-disk ids already claimed by another node.
    pub duplicate_ids: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<ScanWarning>,
    /// Time spent in the pass.
    pub duration: Duration,
}

impl ReconcileReport {
    pub(crate) fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            state: PassState::NotStarted,
            success: false,
            dirs_scanned: 0,
            files_checked: 0,
            ids_assigned: 0,
            identity_mismatches: 0,
            debris_skipped: 0,
            untracked: 0,
            skipped_subtrees: 0,
            unreadable_files: 0,
            missing_ids: 0,
            duplicate_ids: 0,
            warnings: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Number of absorbed scan errors below the root.
    pub fn scan_errors(&self) -> u64 {
        self.skipped_subtrees + self.unreadable_files
    }

    /// Check if there were any warnings during the pass.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

//! Pass state and progress reporting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle of one assignment pass.
///
/// `NotStarted -> ScanningRoot -> ScanningSubtree* -> Done`, or `Aborted`
/// from the first two states when the root is vetoed or cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassState {
    NotStarted,
    ScanningRoot,
    ScanningSubtree,
    Done,
    Aborted,
}

impl PassState {
    /// Check if the pass has ended, successfully or not.
    pub fn is_finished(&self) -> bool {
        matches!(self, PassState::Done | PassState::Aborted)
    }
}

/// Progress information during a pass.
#[derive(Debug, Clone)]
pub struct ReconcileProgress {
    /// Current state of the pass.
    pub state: PassState,
    /// Directories opened so far.
    pub dirs_scanned: u64,
    /// Tracked files compared against disk so far.
    pub files_checked: u64,
    /// Filesystem ids assigned so far.
    pub ids_assigned: u64,
    /// Directory being scanned.
    pub current_path: String,
    /// Time elapsed since the pass started.
    pub elapsed: Duration,
}

impl ReconcileProgress {
    /// Calculate check rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_checked as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_per_second() {
        let mut progress = ReconcileProgress {
            state: PassState::ScanningSubtree,
            dirs_scanned: 1,
            files_checked: 0,
            ids_assigned: 0,
            current_path: "d".to_string(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.files_per_second(), 0.0);

        progress.files_checked = 10;
        progress.elapsed = Duration::from_secs(2);
        assert_eq!(progress.files_per_second(), 5.0);
    }

    #[test]
    fn test_finished_states() {
        assert!(!PassState::ScanningRoot.is_finished());
        assert!(PassState::Done.is_finished());
        assert!(PassState::Aborted.is_finished());
    }
}

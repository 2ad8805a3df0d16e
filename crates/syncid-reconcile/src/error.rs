//! Errors that abort a reconciliation pass.

use syncid_core::ScanError;
use thiserror::Error;

/// Failure of a whole pass. Only root-level conditions surface here.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The sync policy refused the root.
    #[error("Root is not syncable: {root}")]
    Vetoed { root: String },

    /// The root directory could not be opened.
    #[error("Cannot scan root {root}: {source}")]
    RootScan {
        root: String,
        #[source]
        source: ScanError,
    },
}

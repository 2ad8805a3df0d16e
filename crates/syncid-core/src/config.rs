//! Reconciliation configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Name of the debris folder the engine keeps inside each watched root.
pub const DEFAULT_DEBRIS_NAME: &str = ".debris";

/// Configuration for reconciliation passes.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ReconcileConfig {
    /// Absolute path of the debris folder, built with `separator`.
    pub debris_path: String,

    /// Path separator used to build every path in a pass.
    #[builder(default = "default_separator()")]
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Report the pass as failed when any directory or tracked file below
    /// the root cannot be read.
    #[builder(default = "false")]
    #[serde(default)]
    pub strict: bool,

    /// Number of checked files between progress events (0 = never).
    #[builder(default = "1000")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_separator() -> String {
    std::path::MAIN_SEPARATOR_STR.to_string()
}

fn default_progress_interval() -> u64 {
    1000
}

impl ReconcileConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.debris_path {
            Some(ref debris) if debris.is_empty() => {
                return Err("Debris path cannot be empty".to_string());
            }
            Some(_) => {}
            None => return Err("Debris path is required".to_string()),
        }
        if let Some(ref separator) = self.separator
            && separator.is_empty()
        {
            return Err("Separator cannot be empty".to_string());
        }
        Ok(())
    }
}

impl ReconcileConfig {
    /// Create a new reconcile config builder.
    pub fn builder() -> ReconcileConfigBuilder {
        ReconcileConfigBuilder::default()
    }

    /// Create a config with the default debris folder under `root`.
    pub fn for_root(root: &str) -> Self {
        let separator = default_separator();
        Self {
            debris_path: crate::path::join(root, DEFAULT_DEBRIS_NAME, &separator),
            separator,
            strict: false,
            progress_interval: default_progress_interval(),
        }
    }

    /// Check whether `path` lies outside this config's debris area.
    pub fn is_syncable(&self, path: &str) -> bool {
        crate::path::is_syncable(path, &self.debris_path, &self.separator)
    }
}

//! Application-level veto on syncing a root.

use syncid_core::LocalTree;

/// Decides whether a tracked root may currently be synced.
///
/// This is independent of the debris rule: a policy can refuse a root that
/// resolved to a location the application does not allow.
pub trait SyncPolicy {
    /// Check whether the tree rooted at `root` may be synced.
    fn may_sync(&self, tree: &LocalTree, root: &str) -> bool;
}

impl<F> SyncPolicy for F
where
    F: Fn(&LocalTree, &str) -> bool,
{
    fn may_sync(&self, tree: &LocalTree, root: &str) -> bool {
        self(tree, root)
    }
}

/// Policy that never vetoes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SyncPolicy for AllowAll {
    fn may_sync(&self, _tree: &LocalTree, _root: &str) -> bool {
        true
    }
}

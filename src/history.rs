use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::store::{ArtifactStore, WORKFLOW_HISTORY_SET};

/// Compute SHA-256 content hash of an artifact's text.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Durable record of sources (workflow files, repositories) already fully
/// scanned. Append-only.
pub struct HistoryTracker<'a> {
    store: &'a dyn ArtifactStore,
}

impl<'a> HistoryTracker<'a> {
    pub fn new(store: &'a dyn ArtifactStore) -> Self {
        Self { store }
    }

    /// Returns `true` if `source` was marked scanned by this or an earlier run.
    pub fn already_scanned(&self, source: &str) -> Result<bool> {
        self.store.set_contains(WORKFLOW_HISTORY_SET, source)
    }

    /// Marks `source` scanned. Marking twice has no further effect.
    pub fn mark_scanned(&self, source: &str) -> Result<()> {
        self.store.set_add(WORKFLOW_HISTORY_SET, source)
    }

    /// Returns every scanned source, sorted.
    pub fn scanned(&self) -> Result<Vec<String>> {
        self.store.set_members(WORKFLOW_HISTORY_SET)
    }
}

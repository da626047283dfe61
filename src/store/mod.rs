/// Artifact storage module.
///
/// The store persists fetched artifacts, the pointers that name them, and a
/// handful of durable sets. All operations are point operations; writes for
/// distinct keys are independent and need no surrounding transaction.
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::errors::Result;
use crate::types::{ObjectMetadata, RefPointer, StoreStats, StoredObject};

/// Durable set of source identifiers (workflow paths, repositories) already
/// fully scanned.
pub const WORKFLOW_HISTORY_SET: &str = "workflow_download_history";

/// Durable set of dependency keys (see `UsesRef::identity`) whose whole subtree
/// has been resolved and stored.
pub const ACTION_HISTORY_SET: &str = "action_download_history";

/// Key-value persistence backing the resolver.
pub trait ArtifactStore: Send + Sync {
    /// Stores `contents` under `key`, replacing any previous object.
    fn put_object(&self, key: &str, contents: &str, metadata: &ObjectMetadata) -> Result<()>;

    /// Records that `path` resolves to `target`, replacing any previous pointer.
    fn put_ref_pointer(&self, path: &str, target: &str) -> Result<()>;

    /// Returns `true` if `member` is in the named set.
    fn set_contains(&self, set: &str, member: &str) -> Result<bool>;

    /// Adds `member` to the named set; adding an existing member has no effect.
    fn set_add(&self, set: &str, member: &str) -> Result<()>;

    /// Retrieves a stored object by key.
    fn get_object(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Retrieves the pointer stored for a path.
    fn get_ref_pointer(&self, path: &str) -> Result<Option<RefPointer>>;

    /// Returns every member of the named set, sorted.
    fn set_members(&self, set: &str) -> Result<Vec<String>>;

    /// Returns aggregate counts over the store.
    fn stats(&self) -> Result<StoreStats>;
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{ArtifactStore, ACTION_HISTORY_SET, WORKFLOW_HISTORY_SET};
use crate::errors::{Result, UsesGraphError};
use crate::types::*;

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    pointers: BTreeMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-process artifact store. Contents live as long as the value does.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, operation: &str) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|e| UsesGraphError::Store {
            message: format!("failed to lock memory store: {e}"),
            operation: operation.to_string(),
        })
    }
}

impl ArtifactStore for MemoryStore {
    fn put_object(&self, key: &str, contents: &str, metadata: &ObjectMetadata) -> Result<()> {
        let object = StoredObject {
            key: key.to_string(),
            contents: contents.to_string(),
            metadata: metadata.clone(),
            stored_at: 0,
        };
        self.lock("put_object")?
            .objects
            .insert(key.to_string(), object);
        Ok(())
    }

    fn put_ref_pointer(&self, path: &str, target: &str) -> Result<()> {
        self.lock("put_ref_pointer")?
            .pointers
            .insert(path.to_string(), target.to_string());
        Ok(())
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool> {
        Ok(self
            .lock("set_contains")?
            .sets
            .get(set)
            .is_some_and(|members| members.contains(member)))
    }

    fn set_add(&self, set: &str, member: &str) -> Result<()> {
        self.lock("set_add")?
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        Ok(self.lock("get_object")?.objects.get(key).cloned())
    }

    fn get_ref_pointer(&self, path: &str) -> Result<Option<RefPointer>> {
        Ok(self
            .lock("get_ref_pointer")?
            .pointers
            .get(path)
            .map(|target| RefPointer {
                path: path.to_string(),
                target: target.clone(),
            }))
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>> {
        Ok(self
            .lock("set_members")?
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn stats(&self) -> Result<StoreStats> {
        let inner = self.lock("stats")?;
        let count_kind = |kind: ArtifactKind| {
            inner
                .objects
                .values()
                .filter(|o| o.metadata.kind == kind)
                .count() as u64
        };
        let set_len = |set: &str| inner.sets.get(set).map_or(0, |s| s.len() as u64);

        Ok(StoreStats {
            object_count: inner.objects.len() as u64,
            workflow_count: count_kind(ArtifactKind::Workflow),
            action_count: count_kind(ArtifactKind::Action),
            public_count: inner
                .objects
                .values()
                .filter(|o| o.metadata.visibility.is_public())
                .count() as u64,
            ref_pointer_count: inner.pointers.len() as u64,
            scanned_sources: set_len(WORKFLOW_HISTORY_SET),
            resolved_references: set_len(ACTION_HISTORY_SET),
        })
    }
}

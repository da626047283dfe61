#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use usesgraph::errors::{Result, UsesGraphError};
use usesgraph::fetch::{FetchedArtifact, Fetcher, LocalFetcher, RepositoryHost};
use usesgraph::store::{ArtifactStore, MemoryStore};
use usesgraph::types::*;

/// Fetcher serving remote references from a fixed table and recording every call.
///
/// Local references under a local context are read from disk. Doubles as a
/// repository host serving fixed workflow listings.
#[derive(Default)]
pub struct ScriptedFetcher {
    documents: HashMap<String, String>,
    private: HashSet<String>,
    failing: HashSet<String>,
    repositories: HashMap<String, (String, Vec<String>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `contents` for the reference `raw` (or `owner/repo/path@ref` for
    /// `./` references inside remote documents).
    pub fn with(mut self, raw: &str, contents: &str) -> Self {
        self.documents.insert(raw.to_string(), contents.to_string());
        self
    }

    pub fn private(mut self, raw: &str) -> Self {
        self.private.insert(raw.to_string());
        self
    }

    pub fn failing(mut self, raw: &str) -> Self {
        self.failing.insert(raw.to_string());
        self
    }

    /// Hosts `owner/repo` with `default_branch`, listing `files` under the
    /// workflows directory at any ref.
    pub fn repository(mut self, full_name: &str, default_branch: &str, files: &[&str]) -> Self {
        self.repositories.insert(
            full_name.to_string(),
            (
                default_branch.to_string(),
                files.iter().map(|f| f.to_string()).collect(),
            ),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, raw: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == raw).count()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, reference: &UsesRef, ctx: &FetchContext) -> Result<FetchedArtifact> {
        self.calls.lock().unwrap().push(reference.raw.clone());

        let (key, origin) = match (&reference.kind, ctx) {
            (UsesKind::Local { .. }, FetchContext::Local { .. }) => {
                return LocalFetcher.fetch(reference, ctx);
            }
            (
                UsesKind::Local { path },
                FetchContext::Remote {
                    owner,
                    repo,
                    git_ref,
                },
            ) => (format!("{owner}/{repo}/{path}@{git_ref}"), ctx.clone()),
            (
                UsesKind::Remote {
                    owner,
                    repo,
                    git_ref,
                    ..
                },
                _,
            ) => (
                reference.raw.clone(),
                FetchContext::Remote {
                    owner: owner.clone(),
                    repo: repo.clone(),
                    git_ref: git_ref.clone(),
                },
            ),
            _ => unreachable!("resolver only fetches local and remote references"),
        };

        if self.failing.contains(&key) {
            return Err(UsesGraphError::Fetch {
                message: "repository not found".to_string(),
                reference: reference.raw.clone(),
            });
        }

        let visibility = if self.private.contains(&key) {
            Visibility::Private
        } else {
            Visibility::Public
        };

        Ok(FetchedArtifact {
            url: format!("https://example.test/{key}"),
            contents: self.documents.get(&key).cloned().unwrap_or_default(),
            path: key,
            visibility,
            origin,
        })
    }
}

impl RepositoryHost for ScriptedFetcher {
    fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        self.repositories
            .get(&format!("{owner}/{repo}"))
            .map(|(branch, _)| branch.clone())
            .ok_or_else(|| UsesGraphError::Fetch {
                message: "repository not found".to_string(),
                reference: format!("{owner}/{repo}"),
            })
    }

    fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        _git_ref: &str,
        dir: &str,
    ) -> Result<Vec<(String, String)>> {
        let mut files: Vec<(String, String)> = self
            .repositories
            .get(&format!("{owner}/{repo}"))
            .map(|(_, files)| {
                files
                    .iter()
                    .map(|name| (name.clone(), format!("{dir}/{name}")))
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        Ok(files)
    }
}

/// Memory store that counts writes.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    objects_written: AtomicUsize,
    pointers_written: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects_written(&self) -> usize {
        self.objects_written.load(Ordering::SeqCst)
    }

    pub fn pointers_written(&self) -> usize {
        self.pointers_written.load(Ordering::SeqCst)
    }
}

impl ArtifactStore for RecordingStore {
    fn put_object(&self, key: &str, contents: &str, metadata: &ObjectMetadata) -> Result<()> {
        self.objects_written.fetch_add(1, Ordering::SeqCst);
        self.inner.put_object(key, contents, metadata)
    }

    fn put_ref_pointer(&self, path: &str, target: &str) -> Result<()> {
        self.pointers_written.fetch_add(1, Ordering::SeqCst);
        self.inner.put_ref_pointer(path, target)
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool> {
        self.inner.set_contains(set, member)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<()> {
        self.inner.set_add(set, member)
    }

    fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        self.inner.get_object(key)
    }

    fn get_ref_pointer(&self, path: &str) -> Result<Option<RefPointer>> {
        self.inner.get_ref_pointer(path)
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>> {
        self.inner.set_members(set)
    }

    fn stats(&self) -> Result<StoreStats> {
        self.inner.stats()
    }
}

pub fn remote_ctx(owner: &str, repo: &str, git_ref: &str) -> FetchContext {
    FetchContext::Remote {
        owner: owner.to_string(),
        repo: repo.to_string(),
        git_ref: git_ref.to_string(),
    }
}

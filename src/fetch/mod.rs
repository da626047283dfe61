/// Artifact fetching module.
///
/// Fetchers turn a parsed reference plus the context of the document that
/// named it into the artifact's contents and canonical location. Nested
/// references are not followed here; the resolver walks them.
mod github;
mod local;

pub use github::GithubFetcher;
pub use local::LocalFetcher;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, UsesGraphError};
use crate::types::{is_workflow_path, FetchContext, UsesKind, UsesRef, Visibility};

/// Raw result of a fetch, before the resolver attaches provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedArtifact {
    /// Canonical path of the fetched file.
    pub path: String,
    pub url: String,
    pub contents: String,
    /// Visibility of the repository the file came from, as far as the fetcher knows.
    pub visibility: Visibility,
    /// Repository the file lives in.
    pub origin: FetchContext,
}

/// Retrieves the artifact a reference names.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, reference: &UsesRef, ctx: &FetchContext) -> Result<FetchedArtifact>;
}

/// Repository queries needed to scan a repository that is not checked out.
pub trait RepositoryHost: Send + Sync {
    /// Returns the default branch of `owner/repo`.
    fn default_branch(&self, owner: &str, repo: &str) -> Result<String>;

    /// Lists the files (not directories) directly inside `dir` at a git ref
    /// as `(file name, repository-relative path)` pairs sorted by name. A
    /// missing directory yields an empty list.
    fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        dir: &str,
    ) -> Result<Vec<(String, String)>>;
}

/// Routes local references in local repositories to the filesystem and
/// everything else to the hosting service.
pub struct DefaultFetcher {
    local: LocalFetcher,
    github: GithubFetcher,
}

impl DefaultFetcher {
    pub fn new(github: GithubFetcher) -> Self {
        Self {
            local: LocalFetcher,
            github,
        }
    }

    /// Returns the hosting service fetcher, used as the `RepositoryHost` of remote scans.
    pub fn github(&self) -> &GithubFetcher {
        &self.github
    }
}

impl Fetcher for DefaultFetcher {
    fn fetch(&self, reference: &UsesRef, ctx: &FetchContext) -> Result<FetchedArtifact> {
        match (&reference.kind, ctx) {
            (UsesKind::Local { .. }, FetchContext::Local { .. }) => {
                self.local.fetch(reference, ctx)
            }
            (UsesKind::Local { .. }, FetchContext::Remote { .. }) | (UsesKind::Remote { .. }, _) => {
                self.github.fetch(reference, ctx)
            }
            (UsesKind::Docker | UsesKind::Invalid, _) => Err(unsupported(reference)),
        }
    }
}

pub(crate) fn unsupported(reference: &UsesRef) -> UsesGraphError {
    UsesGraphError::Fetch {
        message: "reference kind cannot be fetched".to_string(),
        reference: reference.raw.clone(),
    }
}

/// Candidate files, relative to the repository root, for a referenced path.
///
/// Workflow files are taken as-is; actions are looked up as `action.yml`
/// then `action.yaml` inside the referenced directory.
pub fn candidate_files(path: &str) -> Vec<String> {
    let path = path.trim_start_matches("./").trim_end_matches('/');
    if is_workflow_path(path) || path.ends_with(".yml") || path.ends_with(".yaml") {
        return vec![path.to_string()];
    }
    ["action.yml", "action.yaml"]
        .iter()
        .map(|file| {
            if path.is_empty() {
                file.to_string()
            } else {
                format!("{path}/{file}")
            }
        })
        .collect()
}

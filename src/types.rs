use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kinds of artifacts held in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A workflow file, either scanned directly or called as a reusable workflow.
    Workflow,
    /// An action definition (`action.yml` / `action.yaml`).
    Action,
}

#[allow(clippy::should_implement_trait)]
impl ArtifactKind {
    /// Returns the string representation of this artifact kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Workflow => "workflow",
            ArtifactKind::Action => "action",
        }
    }

    /// Parses a string into an `ArtifactKind`, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<ArtifactKind> {
        match s {
            "workflow" => Some(ArtifactKind::Workflow),
            "action" => Some(ArtifactKind::Action),
            _ => None,
        }
    }
}

/// Visibility of the repository an artifact originates from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        *self == Self::Public
    }
}

/// Directory holding workflow files inside a repository.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// A parsed `uses:` reference.
///
/// Remote references are absolute: byte-identical raw strings denote the same
/// dependency. `./` references only mean something next to the document that
/// names them; see [`UsesRef::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsesRef {
    pub raw: String,
    pub kind: UsesKind,
}

/// The lexical form of a `uses:` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsesKind {
    /// `docker://image:tag`. Never fetched.
    Docker,
    /// `./path/to/action`, relative to the repository of the referencing document.
    Local { path: String },
    /// `owner/repo[/path]@ref`.
    Remote {
        owner: String,
        repo: String,
        path: String,
        git_ref: String,
    },
    /// Anything that matches none of the above.
    Invalid,
}

impl UsesRef {
    /// Classifies a raw `uses:` value.
    pub fn parse(raw: &str) -> Self {
        let kind = if raw.starts_with("docker://") {
            UsesKind::Docker
        } else if let Some(path) = raw.strip_prefix("./") {
            UsesKind::Local {
                path: path.trim_end_matches('/').to_string(),
            }
        } else {
            parse_remote(raw).unwrap_or(UsesKind::Invalid)
        };
        Self {
            raw: raw.to_string(),
            kind,
        }
    }

    /// Returns `true` if this reference can be handed to a fetcher.
    pub fn is_fetchable(&self) -> bool {
        matches!(self.kind, UsesKind::Local { .. } | UsesKind::Remote { .. })
    }

    /// Returns the repository-relative path this reference points at, if any.
    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            UsesKind::Local { path } | UsesKind::Remote { path, .. } => Some(path),
            UsesKind::Docker | UsesKind::Invalid => None,
        }
    }

    /// Key identifying the dependency this reference names from a document
    /// living in `ctx`.
    ///
    /// A `./` reference is qualified with the repository it is relative to:
    /// the joined path under a checkout root, or `owner/repo/<path>@ref` for a
    /// hosted repository. Any other reference is its raw string.
    pub fn identity(&self, ctx: &FetchContext) -> String {
        match (&self.kind, ctx) {
            (UsesKind::Local { path }, FetchContext::Local { root }) => {
                root.join(path).to_string_lossy().to_string()
            }
            (
                UsesKind::Local { path },
                FetchContext::Remote {
                    owner,
                    repo,
                    git_ref,
                },
            ) => format!("{owner}/{repo}/{path}@{git_ref}"),
            _ => self.raw.clone(),
        }
    }

    /// Reusable workflows live under `.github/workflows`; everything else is an action.
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self.path() {
            Some(path) if is_workflow_path(path) => ArtifactKind::Workflow,
            _ => ArtifactKind::Action,
        }
    }
}

fn parse_remote(raw: &str) -> Option<UsesKind> {
    let (location, git_ref) = raw.split_once('@')?;
    if git_ref.is_empty() {
        return None;
    }
    let mut parts = location.splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    let path = parts.next().unwrap_or("").trim_end_matches('/');
    Some(UsesKind::Remote {
        owner: owner.to_string(),
        repo: repo.to_string(),
        path: path.to_string(),
        git_ref: git_ref.to_string(),
    })
}

/// Returns `true` if a repository-relative path names a workflow file.
pub fn is_workflow_path(path: &str) -> bool {
    let path = path.trim_start_matches("./");
    path.starts_with(WORKFLOWS_DIR) && (path.ends_with(".yml") || path.ends_with(".yaml"))
}

/// Where a document lives; decides how its `./` references are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchContext {
    /// A repository checked out on the local filesystem.
    Local { root: PathBuf },
    /// A repository on the hosting service, at a given git ref.
    Remote {
        owner: String,
        repo: String,
        git_ref: String,
    },
}

impl FetchContext {
    pub fn is_local(&self) -> bool {
        matches!(self, FetchContext::Local { .. })
    }
}

/// The resolved content of a workflow or action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Canonical path; the key the artifact is stored under.
    pub path: String,
    pub url: String,
    pub contents: String,
    pub kind: ArtifactKind,
    pub visibility: Visibility,
    /// Identifier of the document that pulled this artifact in.
    pub provenance: String,
    /// Repository the artifact was fetched from; nested references resolve against it.
    pub origin: FetchContext,
}

/// Metadata written alongside an object's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub kind: ArtifactKind,
    pub url: String,
    pub visibility: Visibility,
    pub provenance: String,
    pub content_hash: String,
}

/// An object read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub contents: String,
    pub metadata: ObjectMetadata,
    pub stored_at: i64,
}

/// A mapping from a human-addressable path to the artifact it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefPointer {
    pub path: String,
    pub target: String,
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub object_count: u64,
    pub workflow_count: u64,
    pub action_count: u64,
    pub public_count: u64,
    pub ref_pointer_count: u64,
    pub scanned_sources: u64,
    pub resolved_references: u64,
}

/// Summary of one `Resolver::resolve` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    /// References seen, including nested ones and duplicates.
    pub references: usize,
    /// References handed to the fetcher and stored.
    pub fetched: usize,
    /// References skipped because they were already resolved.
    pub duplicates: usize,
    /// Docker and unparseable references.
    pub unsupported: usize,
}

impl ResolveReport {
    /// Folds another report into this one.
    pub fn merge(&mut self, other: &ResolveReport) {
        self.references += other.references;
        self.fetched += other.fetched;
        self.duplicates += other.duplicates;
        self.unsupported += other.unsupported;
    }
}

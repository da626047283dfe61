use tracing::{debug, warn};

use super::TraversalContext;
use crate::errors::{Result, UsesGraphError};
use crate::extraction::{ReferenceExtractor, UsesExtractor};
use crate::fetch::Fetcher;
use crate::history::{content_hash, HistoryTracker};
use crate::store::{ArtifactStore, ACTION_HISTORY_SET};
use crate::types::*;

/// A reference waiting in the frontier, with the document it came from.
struct PendingRef {
    raw: String,
    ctx: FetchContext,
    provenance: String,
}

/// One unit of work on the traversal stack.
enum Step {
    Resolve(PendingRef),
    /// Every reference nested under the dependency `key` has been handled.
    Complete(String),
}

/// Resolves the transitive closure of a document's `uses:` references.
///
/// Traversal is depth-first over an explicit stack: a document's references
/// are handled front to back, and the references found inside each fetched
/// artifact are handled before the next sibling.
pub struct Resolver<'a> {
    store: &'a dyn ArtifactStore,
    fetcher: &'a dyn Fetcher,
    extractor: Box<dyn ReferenceExtractor>,
    persist_visited: bool,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver using the default `uses:` extractor.
    pub fn new(store: &'a dyn ArtifactStore, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            store,
            fetcher,
            extractor: Box::new(UsesExtractor),
            persist_visited: false,
        }
    }

    /// When enabled, references resolved (with everything nested under them)
    /// are remembered in the store and skipped by later traversals.
    pub fn with_persisted_visited(mut self, persist: bool) -> Self {
        self.persist_visited = persist;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn ReferenceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Resolves every reference reachable from `document`.
    ///
    /// `source` names the document: it is the provenance of the references
    /// found directly in it and is marked scanned once the traversal
    /// completes. `ctx` is the repository the document lives in.
    ///
    /// A fetch failure aborts the traversal and is returned as-is. Artifacts
    /// stored before the failure stay stored, the failing reference stays
    /// claimed in `traversal`, and `source` is not marked scanned.
    pub fn resolve(
        &self,
        traversal: &TraversalContext,
        document: &str,
        source: &str,
        ctx: &FetchContext,
    ) -> Result<ResolveReport> {
        let mut report = ResolveReport::default();
        let mut frontier: Vec<Step> = Vec::new();
        self.push_references(&mut frontier, document, ctx, source);

        while let Some(step) = frontier.pop() {
            let pending = match step {
                Step::Resolve(pending) => pending,
                Step::Complete(key) => {
                    if self.persist_visited {
                        self.store.set_add(ACTION_HISTORY_SET, &key)?;
                    }
                    continue;
                }
            };

            if traversal.is_cancelled() {
                return Err(UsesGraphError::Cancelled);
            }
            report.references += 1;

            let reference = UsesRef::parse(&pending.raw);
            if reference.kind == UsesKind::Invalid {
                warn!(
                    reference = %reference.raw,
                    source = %pending.provenance,
                    "skipping invalid reference"
                );
                report.unsupported += 1;
                continue;
            }
            if !reference.is_fetchable() {
                debug!(reference = %reference.raw, "skipping docker reference");
                report.unsupported += 1;
                continue;
            }

            let key = reference.identity(&pending.ctx);
            if !traversal.visited().claim(&key) {
                report.duplicates += 1;
                continue;
            }

            if self.persist_visited && self.store.set_contains(ACTION_HISTORY_SET, &key)? {
                debug!(reference = %key, "resolved in an earlier run");
                report.duplicates += 1;
                continue;
            }

            let artifact = self.fetch(&reference, &pending)?;
            self.record(&artifact)?;
            report.fetched += 1;

            frontier.push(Step::Complete(key));
            self.push_references(
                &mut frontier,
                &artifact.contents,
                &artifact.origin,
                &artifact.path,
            );
        }

        HistoryTracker::new(self.store).mark_scanned(source)?;

        debug!(
            source = %source,
            references = report.references,
            fetched = report.fetched,
            duplicates = report.duplicates,
            "resolved document"
        );
        Ok(report)
    }

    /// Stores an artifact and the pointer naming it.
    pub fn record(&self, artifact: &Artifact) -> Result<()> {
        let metadata = ObjectMetadata {
            kind: artifact.kind,
            url: artifact.url.clone(),
            visibility: artifact.visibility,
            provenance: artifact.provenance.clone(),
            content_hash: content_hash(&artifact.contents),
        };
        self.store
            .put_object(&artifact.path, &artifact.contents, &metadata)?;
        // Pointers name the current content until artifacts are pinned to commits.
        self.store.put_ref_pointer(&artifact.path, &artifact.path)
    }

    fn fetch(&self, reference: &UsesRef, pending: &PendingRef) -> Result<Artifact> {
        debug!(reference = %reference.raw, provenance = %pending.provenance, "fetching");
        let fetched = self.fetcher.fetch(reference, &pending.ctx)?;

        // Anything pulled in by a locally scanned document is private.
        let visibility = if pending.ctx.is_local() {
            Visibility::Private
        } else {
            fetched.visibility
        };

        Ok(Artifact {
            path: fetched.path,
            url: fetched.url,
            contents: fetched.contents,
            kind: reference.artifact_kind(),
            visibility,
            provenance: pending.provenance.clone(),
            origin: fetched.origin,
        })
    }

    /// Pushes the references of `text` so that they pop in document order.
    fn push_references(
        &self,
        frontier: &mut Vec<Step>,
        text: &str,
        ctx: &FetchContext,
        provenance: &str,
    ) {
        let references = self.extractor.extract_references(text);
        frontier.extend(references.into_iter().rev().map(|raw| {
            Step::Resolve(PendingRef {
                raw,
                ctx: ctx.clone(),
                provenance: provenance.to_string(),
            })
        }));
    }
}

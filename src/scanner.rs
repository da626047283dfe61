use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{should_scan_workflow, UsesGraphConfig};
use crate::errors::{Result, UsesGraphError};
use crate::fetch::{Fetcher, RepositoryHost};
use crate::history::HistoryTracker;
use crate::resolution::{Resolver, TraversalContext};
use crate::store::ArtifactStore;
use crate::types::*;

/// Entry point for callers: finds top-level workflows and resolves them.
pub struct Scanner<'a> {
    store: &'a dyn ArtifactStore,
    fetcher: &'a dyn Fetcher,
    config: UsesGraphConfig,
}

/// Result of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Repositories whose workflows were resolved.
    pub repositories: usize,
    /// Repositories skipped because an earlier run already scanned them.
    pub repositories_skipped: usize,
    /// Workflows resolved.
    pub workflows: usize,
    /// Workflows excluded by the allow-list or already scanned.
    pub workflows_skipped: usize,
    /// Totals over every resolved workflow.
    pub references: ResolveReport,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

impl<'a> Scanner<'a> {
    pub fn new(
        store: &'a dyn ArtifactStore,
        fetcher: &'a dyn Fetcher,
        config: UsesGraphConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.store, self.fetcher).with_persisted_visited(self.config.persist_visited)
    }

    fn history(&self) -> HistoryTracker<'a> {
        HistoryTracker::new(self.store)
    }

    /// Lists the workflow files of a local repository as `(file name, path)`,
    /// sorted by name.
    pub fn workflow_files(&self, repo_root: &Path) -> Result<Vec<(String, PathBuf)>> {
        let dir = repo_root.join(&self.config.workflows_dir);
        if !dir.is_dir() {
            return Err(UsesGraphError::Scan {
                message: "workflow directory does not exist".to_string(),
                path: dir.display().to_string(),
            });
        }

        let mut workflows = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| UsesGraphError::Scan {
                message: format!("failed to list workflows: {e}"),
                path: dir.display().to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.config.is_workflow_file(&name) {
                workflows.push((name, entry.into_path()));
            }
        }
        Ok(workflows)
    }

    /// Scans repositories checked out on disk.
    ///
    /// Every path must be a directory. Repositories already in the download
    /// history are skipped. References found in local workflows are stored as
    /// private whatever the upstream visibility.
    pub fn scan_local(
        &self,
        traversal: &TraversalContext,
        paths: &[PathBuf],
        only_workflows: &[String],
    ) -> Result<ScanReport> {
        let start = Instant::now();
        let mut report = ScanReport::default();

        for path in paths {
            if !path.is_dir() {
                return Err(UsesGraphError::Scan {
                    message: "local repository does not exist".to_string(),
                    path: path.display().to_string(),
                });
            }
            self.scan_local_repository(traversal, path, only_workflows, &mut report)?;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn scan_local_repository(
        &self,
        traversal: &TraversalContext,
        root: &Path,
        only_workflows: &[String],
        report: &mut ScanReport,
    ) -> Result<()> {
        let repo_id = root.to_string_lossy().to_string();
        let history = self.history();
        if history.already_scanned(&repo_id)? {
            info!(repository = %repo_id, "already scanned, skipping");
            report.repositories_skipped += 1;
            return Ok(());
        }

        let workflows = self.workflow_files(root)?;
        info!(repository = %repo_id, count = workflows.len(), "found workflows");

        let resolver = self.resolver();
        let ctx = FetchContext::Local {
            root: root.to_path_buf(),
        };

        for (name, path) in &workflows {
            let source = path.to_string_lossy().to_string();
            if !should_scan_workflow(name, only_workflows) || history.already_scanned(&source)? {
                debug!(workflow = %name, "skipping");
                report.workflows_skipped += 1;
                continue;
            }

            debug!(workflow = %name, "reading");
            let contents = std::fs::read_to_string(path)?;

            resolver.record(&Artifact {
                path: source.clone(),
                url: source.clone(),
                contents: contents.clone(),
                kind: ArtifactKind::Workflow,
                visibility: Visibility::Private,
                provenance: repo_id.clone(),
                origin: ctx.clone(),
            })?;

            let resolved = resolver.resolve(traversal, &contents, &source, &ctx)?;
            report.references.merge(&resolved);
            report.workflows += 1;
        }

        history.mark_scanned(&repo_id)?;
        report.repositories += 1;
        info!(
            repository = %repo_id,
            workflows = report.workflows,
            fetched = report.references.fetched,
            "repository scanned"
        );
        Ok(())
    }

    /// Scans a repository on the hosting service, `owner/repo`, at `git_ref`
    /// or its default branch.
    ///
    /// `host` lists the workflows; they are downloaded through the scanner's
    /// fetcher. Workflows already in the download history are skipped before
    /// any download. Workflows and everything they reference keep the
    /// visibility reported by the fetcher.
    pub fn scan_repo(
        &self,
        traversal: &TraversalContext,
        host: &dyn RepositoryHost,
        full_name: &str,
        git_ref: Option<&str>,
        only_workflows: &[String],
    ) -> Result<ScanReport> {
        let start = Instant::now();
        let mut report = ScanReport::default();

        let (owner, repo) = full_name
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| UsesGraphError::Scan {
                message: "expected a repository in the form owner/repo".to_string(),
                path: full_name.to_string(),
            })?;

        let history = self.history();
        if history.already_scanned(full_name)? {
            info!(repository = %full_name, "already scanned, skipping");
            report.repositories_skipped += 1;
            report.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        let git_ref = match git_ref {
            Some(r) => r.to_string(),
            None => host.default_branch(owner, repo)?,
        };
        let workflows = host.list_workflows(owner, repo, &git_ref, &self.config.workflows_dir)?;
        info!(repository = %full_name, git_ref = %git_ref, count = workflows.len(), "found workflows");

        let resolver = self.resolver();
        let ctx = FetchContext::Remote {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.clone(),
        };
        for (name, path) in &workflows {
            if !self.config.is_workflow_file(name) || !should_scan_workflow(name, only_workflows) {
                debug!(workflow = %name, "skipping");
                report.workflows_skipped += 1;
                continue;
            }

            let reference = UsesRef::parse(&format!("{owner}/{repo}/{path}@{git_ref}"));
            let source = reference.identity(&ctx);
            if history.already_scanned(&source)? {
                debug!(workflow = %name, "already scanned");
                report.workflows_skipped += 1;
                continue;
            }

            let fetched = self.fetcher.fetch(&reference, &ctx)?;

            resolver.record(&Artifact {
                path: fetched.path.clone(),
                url: fetched.url.clone(),
                contents: fetched.contents.clone(),
                kind: ArtifactKind::Workflow,
                visibility: fetched.visibility,
                provenance: full_name.to_string(),
                origin: fetched.origin.clone(),
            })?;

            let resolved =
                resolver.resolve(traversal, &fetched.contents, &source, &fetched.origin)?;
            report.references.merge(&resolved);
            report.workflows += 1;
        }

        history.mark_scanned(full_name)?;
        report.repositories += 1;
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }
}

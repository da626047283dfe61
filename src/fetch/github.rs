use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{candidate_files, unsupported, FetchedArtifact, Fetcher, RepositoryHost};
use crate::config::UsesGraphConfig;
use crate::errors::{Result, UsesGraphError};
use crate::types::{FetchContext, UsesKind, UsesRef, Visibility};

/// Repository metadata returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Deserialize)]
struct RepoInfo {
    private: bool,
    default_branch: String,
}

/// Directory entry returned by the contents API.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Fetches actions and workflows from the hosting service over HTTPS.
///
/// Requests are blocking. Repository visibility is looked up once per
/// repository and cached for the lifetime of the fetcher.
pub struct GithubFetcher {
    agent: ureq::Agent,
    api_url: String,
    raw_url: String,
    web_url: String,
    user_agent: String,
    token: Option<String>,
    visibility_cache: Mutex<HashMap<String, Visibility>>,
}

impl GithubFetcher {
    pub fn new(config: &UsesGraphConfig, token: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_content_url.trim_end_matches('/').to_string(),
            web_url: config.web_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            token,
            visibility_cache: Mutex::new(HashMap::new()),
        }
    }

    /// URL of a file's raw contents at a git ref.
    pub fn raw_file_url(&self, owner: &str, repo: &str, git_ref: &str, file: &str) -> String {
        format!("{}/{owner}/{repo}/{git_ref}/{file}", self.raw_url)
    }

    /// Browsable URL of a file at a git ref.
    pub fn web_file_url(&self, owner: &str, repo: &str, git_ref: &str, file: &str) -> String {
        format!("{}/{owner}/{repo}/blob/{git_ref}/{file}", self.web_url)
    }

    fn get(&self, url: &str, accept: &str) -> std::result::Result<String, ureq::Error> {
        let mut request = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", accept);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let mut response = request.call()?;
        response.body_mut().read_to_string()
    }

    /// Downloads a file, returning `None` when it does not exist at that ref.
    pub fn fetch_file(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        file: &str,
    ) -> std::result::Result<Option<String>, ureq::Error> {
        let url = self.raw_file_url(owner, repo, git_ref, file);
        debug!(url = %url, "downloading");
        match self.get(&url, "text/plain") {
            Ok(body) => Ok(Some(body)),
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn repo_info(&self, owner: &str, repo: &str) -> Result<RepoInfo> {
        let url = format!("{}/repos/{owner}/{repo}", self.api_url);
        let body = self
            .get(&url, "application/vnd.github+json")
            .map_err(|e| UsesGraphError::Fetch {
                message: format!("failed to query repository: {e}"),
                reference: format!("{owner}/{repo}"),
            })?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Looks up whether a repository is public. Lookup failures count as private.
    pub fn repository_visibility(&self, owner: &str, repo: &str) -> Visibility {
        let key = format!("{owner}/{repo}");
        if let Ok(cache) = self.visibility_cache.lock() {
            if let Some(visibility) = cache.get(&key) {
                return *visibility;
            }
        }

        let visibility = match self.repo_info(owner, repo) {
            Ok(info) if !info.private => Visibility::Public,
            Ok(_) => Visibility::Private,
            Err(e) => {
                warn!(repository = %key, error = %e, "visibility lookup failed, assuming private");
                Visibility::Private
            }
        };

        if let Ok(mut cache) = self.visibility_cache.lock() {
            cache.insert(key, visibility);
        }
        visibility
    }
}

impl RepositoryHost for GithubFetcher {
    fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        Ok(self.repo_info(owner, repo)?.default_branch)
    }

    fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        dir: &str,
    ) -> Result<Vec<(String, String)>> {
        let url = format!(
            "{}/repos/{owner}/{repo}/contents/{dir}?ref={git_ref}",
            self.api_url
        );
        let body = match self.get(&url, "application/vnd.github+json") {
            Ok(body) => body,
            Err(ureq::Error::StatusCode(404)) => return Ok(Vec::new()),
            Err(e) => {
                return Err(UsesGraphError::Fetch {
                    message: format!("failed to list workflows: {e}"),
                    reference: format!("{owner}/{repo}@{git_ref}"),
                })
            }
        };

        let entries: Vec<ContentEntry> = serde_json::from_str(&body)?;
        let mut workflows: Vec<(String, String)> = entries
            .into_iter()
            .filter(|e| e.kind == "file")
            .map(|e| (e.name, e.path))
            .collect();
        workflows.sort();
        Ok(workflows)
    }
}

impl Fetcher for GithubFetcher {
    fn fetch(&self, reference: &UsesRef, ctx: &FetchContext) -> Result<FetchedArtifact> {
        let (owner, repo, git_ref, path) = match (&reference.kind, ctx) {
            (
                UsesKind::Remote {
                    owner,
                    repo,
                    path,
                    git_ref,
                },
                _,
            ) => (owner, repo, git_ref, path),
            (
                UsesKind::Local { path },
                FetchContext::Remote {
                    owner,
                    repo,
                    git_ref,
                },
            ) => (owner, repo, git_ref, path),
            _ => return Err(unsupported(reference)),
        };

        for file in candidate_files(path) {
            let contents = self
                .fetch_file(owner, repo, git_ref, &file)
                .map_err(|e| UsesGraphError::Fetch {
                    message: format!("failed to download '{file}': {e}"),
                    reference: reference.raw.clone(),
                })?;

            if let Some(contents) = contents {
                return Ok(FetchedArtifact {
                    path: format!("{owner}/{repo}/{file}@{git_ref}"),
                    url: self.web_file_url(owner, repo, git_ref, &file),
                    contents,
                    visibility: self.repository_visibility(owner, repo),
                    origin: FetchContext::Remote {
                        owner: owner.clone(),
                        repo: repo.clone(),
                        git_ref: git_ref.clone(),
                    },
                });
            }
        }

        Err(UsesGraphError::Fetch {
            message: format!("no action or workflow found in {owner}/{repo} at '{git_ref}'"),
            reference: reference.raw.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_urls_from_config() {
        let config = UsesGraphConfig {
            raw_content_url: "https://raw.example.com/".to_string(),
            web_url: "https://git.example.com".to_string(),
            ..UsesGraphConfig::default()
        };
        let fetcher = GithubFetcher::new(&config, None);
        assert_eq!(
            fetcher.raw_file_url("org", "act", "v1", "action.yml"),
            "https://raw.example.com/org/act/v1/action.yml"
        );
        assert_eq!(
            fetcher.web_file_url("org", "act", "v1", "action.yml"),
            "https://git.example.com/org/act/blob/v1/action.yml"
        );
    }

    #[test]
    fn docker_references_are_rejected() {
        let fetcher = GithubFetcher::new(&UsesGraphConfig::default(), None);
        let reference = UsesRef::parse("docker://alpine:3");
        let ctx = FetchContext::Remote {
            owner: "org".to_string(),
            repo: "repo".to_string(),
            git_ref: "main".to_string(),
        };
        assert!(matches!(
            fetcher.fetch(&reference, &ctx),
            Err(UsesGraphError::Fetch { .. })
        ));
    }
}

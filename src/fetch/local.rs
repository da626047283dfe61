use std::fs;
use std::io::ErrorKind;

use tracing::debug;

use super::{candidate_files, unsupported, FetchedArtifact, Fetcher};
use crate::errors::{Result, UsesGraphError};
use crate::types::{FetchContext, UsesKind, UsesRef, Visibility};

/// Reads `./` references from a repository checked out on disk.
///
/// Local files are always reported as private.
pub struct LocalFetcher;

impl Fetcher for LocalFetcher {
    fn fetch(&self, reference: &UsesRef, ctx: &FetchContext) -> Result<FetchedArtifact> {
        let (UsesKind::Local { path }, FetchContext::Local { root }) = (&reference.kind, ctx)
        else {
            return Err(unsupported(reference));
        };

        for candidate in candidate_files(path) {
            let file = root.join(&candidate);
            match fs::read_to_string(&file) {
                Ok(contents) => {
                    let path = file.to_string_lossy().to_string();
                    debug!(reference = %reference.raw, path = %path, "read local artifact");
                    return Ok(FetchedArtifact {
                        url: path.clone(),
                        path,
                        contents,
                        visibility: Visibility::Private,
                        origin: ctx.clone(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(UsesGraphError::Fetch {
                        message: format!("failed to read '{}': {e}", file.display()),
                        reference: reference.raw.clone(),
                    })
                }
            }
        }

        Err(UsesGraphError::Fetch {
            message: format!("no action or workflow found under '{}'", root.join(path).display()),
            reference: reference.raw.clone(),
        })
    }
}

//! Repositories resource client.

use std::sync::Arc;

use tracing::debug;

use super::segment;
use crate::error::Error;
use crate::transport::HttpTransport;
use crate::types::{RepoRef, Repository};

/// Client for repository lookups.
pub struct ReposClient {
    transport: Arc<HttpTransport>,
}

impl ReposClient {
    /// Create a new repos client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// Get repository information, or `None` if it does not exist or is not visible.
    ///
    /// Redirects are followed, but a repository that now lives under another
    /// owner or name is not the one asked for and yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than 404.
    pub async fn get(&self, repo: &RepoRef) -> Result<Option<Repository>, Error> {
        let path = format!("repos/{}/{}", segment(&repo.owner), segment(&repo.name));
        match self.transport.get::<Repository>(&path).await {
            Ok(repository) if repository.is_at(repo) => Ok(Some(repository)),
            Ok(repository) => {
                debug!(
                    requested = %repo,
                    found = %repository.full_name,
                    "Repository lookup resolved to a different repository"
                );
                Ok(None)
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check that an organization exists and is visible to the credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the organization cannot be read.
    pub async fn check_org_access(&self, org: &str) -> Result<(), Error> {
        self.transport
            .get::<serde_json::Value>(&format!("orgs/{}", segment(org)))
            .await?;
        Ok(())
    }
}

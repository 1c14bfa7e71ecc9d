//! The narrow platform seam consumed by the migrator.
//!
//! `GitHubClient` implements it against the REST API; `testing::MockPlatform`
//! implements it in memory.

use async_trait::async_trait;

use crate::capability::CapabilitySet;
use crate::error::Error;
use crate::types::{CurrentUser, Environment, RepoRef, Repository, Variable, VariableScope};

/// Typed operations against one account on one host.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Authenticate the credential.
    async fn authenticated_user(&self) -> Result<CurrentUser, Error>;

    /// Scopes granted to the credential.
    async fn capabilities(&self) -> Result<CapabilitySet, Error>;

    /// Sleep until the quota resets if it is nearly exhausted.
    async fn wait_for_rate_limit(&self);

    async fn list_variables(&self, scope: &VariableScope) -> Result<Vec<Variable>, Error>;

    /// Get one variable, `None` if absent.
    async fn get_variable(&self, scope: &VariableScope, name: &str)
        -> Result<Option<Variable>, Error>;

    async fn create_variable(&self, scope: &VariableScope, variable: &Variable)
        -> Result<(), Error>;

    async fn update_variable(&self, scope: &VariableScope, variable: &Variable)
        -> Result<(), Error>;

    async fn list_environments(&self, repo: &RepoRef) -> Result<Vec<Environment>, Error>;

    /// Get one environment, `None` if absent.
    async fn get_environment(&self, repo: &RepoRef, name: &str)
        -> Result<Option<Environment>, Error>;

    async fn create_environment(&self, repo: &RepoRef, name: &str) -> Result<Environment, Error>;

    /// Make sure an environment exists, creating it if needed.
    ///
    /// Returns the environment and whether it was created by this call.
    async fn ensure_environment(
        &self,
        repo: &RepoRef,
        name: &str,
    ) -> Result<(Environment, bool), Error> {
        if let Some(existing) = self.get_environment(repo, name).await? {
            return Ok((existing, false));
        }
        let created = self.create_environment(repo, name).await?;
        Ok((created, true))
    }

    /// Repositories an organization variable with `selected` visibility is shared with.
    async fn selected_repositories(&self, org: &str, name: &str)
        -> Result<Vec<Repository>, Error>;

    /// Look up a repository, `None` if absent or not visible.
    async fn find_repository(&self, repo: &RepoRef) -> Result<Option<Repository>, Error>;
}

//! Platform API client.
//!
//! Provides the primary interface to one account on one host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::api::PlatformApi;
use crate::capability::CapabilitySet;
use crate::clients::{EnvironmentsClient, ReposClient, UsersClient, VariablesClient};
use crate::error::Error;
use crate::rate_limit::RateLimitInfo;
use crate::transport::{HttpTransport, RetryConfig};
use crate::types::{CurrentUser, Environment, RepoRef, Repository, Variable, VariableScope};

/// Default base URL for the public platform API.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client bound to one credential and one API host.
///
/// Aggregates the resource clients over a shared transport. Source and
/// target each get their own instance, so rate limit state never mixes.
///
/// # Example
///
/// ```rust,ignore
/// use vars_migrator::{GitHubClient, VariableScope};
///
/// let client = GitHubClient::new("ghp_xxx", None, None, None)?;
/// let vars = client.variables().list(&VariableScope::organization("octo-org")).await?;
/// ```
pub struct GitHubClient {
    transport: Arc<HttpTransport>,
    variables: VariablesClient,
    environments: EnvironmentsClient,
    repos: ReposClient,
    users: UsersClient,
    identity: OnceCell<(CurrentUser, CapabilitySet)>,
}

impl GitHubClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer token
    /// * `base_url` - API root (default: <https://api.github.com>)
    /// * `timeout` - Request timeout (default: 30 seconds)
    /// * `retry_config` - Configuration for retry behavior (optional)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be created.
    pub fn new(
        token: &str,
        base_url: Option<&str>,
        timeout: Option<Duration>,
        retry_config: Option<RetryConfig>,
    ) -> Result<Self, Error> {
        let base_url = base_url.unwrap_or(DEFAULT_BASE_URL);
        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let transport = Arc::new(HttpTransport::new(base_url, token, timeout, retry_config)?);

        Ok(Self {
            variables: VariablesClient::new(Arc::clone(&transport)),
            environments: EnvironmentsClient::new(Arc::clone(&transport)),
            repos: ReposClient::new(Arc::clone(&transport)),
            users: UsersClient::new(Arc::clone(&transport)),
            transport,
            identity: OnceCell::new(),
        })
    }

    /// Get the underlying HTTP transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<HttpTransport> {
        &self.transport
    }

    /// Get the most recent rate limit snapshot.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        self.transport.rate_limit()
    }

    /// Get the variables client.
    #[must_use]
    pub fn variables(&self) -> &VariablesClient {
        &self.variables
    }

    /// Get the environments client.
    #[must_use]
    pub fn environments(&self) -> &EnvironmentsClient {
        &self.environments
    }

    /// Get the repos client.
    #[must_use]
    pub fn repos(&self) -> &ReposClient {
        &self.repos
    }

    /// Get the users client.
    #[must_use]
    pub fn users(&self) -> &UsersClient {
        &self.users
    }

    /// The authenticated user and token scopes, fetched once per client.
    ///
    /// Failures are not cached.
    async fn identity(&self) -> Result<&(CurrentUser, CapabilitySet), Error> {
        self.identity.get_or_try_init(|| self.users.current()).await
    }
}

#[async_trait]
impl PlatformApi for GitHubClient {
    async fn authenticated_user(&self) -> Result<CurrentUser, Error> {
        let (user, _) = self.identity().await?;
        Ok(user.clone())
    }

    async fn capabilities(&self) -> Result<CapabilitySet, Error> {
        let (_, scopes) = self.identity().await?;
        Ok(scopes.clone())
    }

    async fn wait_for_rate_limit(&self) {
        self.transport.wait_for_rate_limit().await;
    }

    async fn list_variables(&self, scope: &VariableScope) -> Result<Vec<Variable>, Error> {
        self.variables.list(scope).await
    }

    async fn get_variable(
        &self,
        scope: &VariableScope,
        name: &str,
    ) -> Result<Option<Variable>, Error> {
        self.variables.get(scope, name).await
    }

    async fn create_variable(&self, scope: &VariableScope, variable: &Variable) -> Result<(), Error> {
        self.variables.create(scope, variable).await
    }

    async fn update_variable(&self, scope: &VariableScope, variable: &Variable) -> Result<(), Error> {
        self.variables.update(scope, variable).await
    }

    async fn list_environments(&self, repo: &RepoRef) -> Result<Vec<Environment>, Error> {
        self.environments.list(repo).await
    }

    async fn get_environment(
        &self,
        repo: &RepoRef,
        name: &str,
    ) -> Result<Option<Environment>, Error> {
        self.environments.get(repo, name).await
    }

    async fn create_environment(&self, repo: &RepoRef, name: &str) -> Result<Environment, Error> {
        self.environments.create(repo, name).await
    }

    async fn selected_repositories(
        &self,
        org: &str,
        name: &str,
    ) -> Result<Vec<Repository>, Error> {
        self.variables.selected_repositories(org, name).await
    }

    async fn find_repository(&self, repo: &RepoRef) -> Result<Option<Repository>, Error> {
        self.repos.get(repo).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = GitHubClient::new("test-token", None, None, None)
            .expect("client creation should succeed");
        assert_eq!(client.transport().base_url(), DEFAULT_BASE_URL);
        assert!(client.rate_limit().is_none());
    }

    #[test]
    fn test_client_custom_base_url() {
        let client = GitHubClient::new(
            "test-token",
            Some("https://ghe.example.com/api/v3/"),
            Some(Duration::from_secs(5)),
            Some(RetryConfig::default()),
        )
        .expect("client creation should succeed");
        assert_eq!(client.transport().base_url(), "https://ghe.example.com/api/v3");
    }
}

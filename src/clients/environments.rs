//! Deployment environments resource client.

use std::sync::Arc;

use reqwest::Method;
use serde_json::json;

use super::segment;
use crate::error::Error;
use crate::transport::HttpTransport;
use crate::types::environments::EnvironmentPage;
use crate::types::{Environment, RepoRef};

/// Client for repository deployment environments.
pub struct EnvironmentsClient {
    transport: Arc<HttpTransport>,
}

fn collection_path(repo: &RepoRef) -> String {
    format!(
        "repos/{}/{}/environments",
        segment(&repo.owner),
        segment(&repo.name)
    )
}

impl EnvironmentsClient {
    /// Create a new environments client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// List every environment of a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched.
    pub async fn list(&self, repo: &RepoRef) -> Result<Vec<Environment>, Error> {
        self.transport
            .get_paginated(&collection_path(repo), |page: EnvironmentPage| page.environments)
            .await
    }

    /// Get one environment by name, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than 404.
    pub async fn get(&self, repo: &RepoRef, name: &str) -> Result<Option<Environment>, Error> {
        let path = format!("{}/{}", collection_path(repo), segment(name));
        match self.transport.get::<Environment>(&path).await {
            Ok(env) => Ok(Some(env)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an environment with default protection settings.
    ///
    /// The platform creates environments with a `PUT` of an empty object;
    /// repeating it for an existing environment leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the write.
    pub async fn create(&self, repo: &RepoRef, name: &str) -> Result<Environment, Error> {
        let path = format!("{}/{}", collection_path(repo), segment(name));
        self.transport.send(Method::PUT, &path, &json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path() {
        assert_eq!(
            collection_path(&RepoRef::new("octo-org", "app")),
            "repos/octo-org/app/environments"
        );
    }
}

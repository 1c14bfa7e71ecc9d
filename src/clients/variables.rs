//! Actions variables resource client.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;

use super::segment;
use crate::error::Error;
use crate::transport::HttpTransport;
use crate::types::variables::VariablePage;
use crate::types::{Repository, Variable, VariableScope, Visibility};
use crate::types::repos::RepositoryPage;

/// Client for organization, repository and environment variables.
pub struct VariablesClient {
    transport: Arc<HttpTransport>,
}

/// Body of a create or update request.
#[derive(Debug, Serialize)]
struct VariableRequest<'a> {
    name: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_repository_ids: Option<&'a [u64]>,
}

impl<'a> VariableRequest<'a> {
    /// Organization writes always carry a visibility; `selected` always
    /// carries an explicit id list, even when empty.
    fn new(scope: &VariableScope, variable: &'a Variable) -> Self {
        if !scope.is_organization() {
            return Self {
                name: &variable.name,
                value: &variable.value,
                visibility: None,
                selected_repository_ids: None,
            };
        }

        let visibility = variable.visibility.unwrap_or(Visibility::All);
        let selected_repository_ids = match visibility {
            Visibility::Selected => Some(variable.selected_repository_ids.as_deref().unwrap_or(&[])),
            Visibility::All | Visibility::Private => None,
        };

        Self {
            name: &variable.name,
            value: &variable.value,
            visibility: Some(visibility),
            selected_repository_ids,
        }
    }
}

/// Collection path of the variables in a scope.
pub(crate) fn collection_path(scope: &VariableScope) -> String {
    match scope {
        VariableScope::Organization(org) => format!("orgs/{}/actions/variables", segment(org)),
        VariableScope::Repository(repo) => format!(
            "repos/{}/{}/actions/variables",
            segment(&repo.owner),
            segment(&repo.name)
        ),
        VariableScope::Environment { repo, environment } => format!(
            "repos/{}/{}/environments/{}/variables",
            segment(&repo.owner),
            segment(&repo.name),
            segment(environment)
        ),
    }
}

fn item_path(scope: &VariableScope, name: &str) -> String {
    format!("{}/{}", collection_path(scope), segment(name))
}

impl VariablesClient {
    /// Create a new variables client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// List every variable in a scope, in the order the platform returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched.
    pub async fn list(&self, scope: &VariableScope) -> Result<Vec<Variable>, Error> {
        self.transport
            .get_paginated(&collection_path(scope), |page: VariablePage| page.variables)
            .await
    }

    /// Get one variable by name.
    ///
    /// # Returns
    ///
    /// `None` if the variable does not exist in the scope.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than 404.
    pub async fn get(&self, scope: &VariableScope, name: &str) -> Result<Option<Variable>, Error> {
        match self.transport.get::<Variable>(&item_path(scope, name)).await {
            Ok(variable) => Ok(Some(variable)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the write.
    pub async fn create(&self, scope: &VariableScope, variable: &Variable) -> Result<(), Error> {
        self.transport
            .send_no_content(
                Method::POST,
                &collection_path(scope),
                &VariableRequest::new(scope, variable),
            )
            .await
    }

    /// Overwrite an existing variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the write.
    pub async fn update(&self, scope: &VariableScope, variable: &Variable) -> Result<(), Error> {
        self.transport
            .send_no_content(
                Method::PATCH,
                &item_path(scope, &variable.name),
                &VariableRequest::new(scope, variable),
            )
            .await
    }

    /// List the repositories an organization variable is shared with.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched.
    pub async fn selected_repositories(
        &self,
        org: &str,
        name: &str,
    ) -> Result<Vec<Repository>, Error> {
        let path = format!(
            "{}/repositories",
            item_path(&VariableScope::organization(org), name)
        );
        self.transport
            .get_paginated(&path, |page: RepositoryPage| page.repositories)
            .await
    }
}

//! Actions variable data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repos::RepoRef;

/// Which repositories of an organization may read an organization variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    All,
    Private,
    Selected,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Private => "private",
            Self::Selected => "selected",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "private" => Ok(Self::Private),
            "selected" => Ok(Self::Selected),
            other => Err(format!(
                "invalid visibility '{other}'. Must be 'all', 'private' or 'selected'"
            )),
        }
    }
}

/// A named configuration variable.
///
/// Values are opaque and never interpreted. `visibility` and
/// `selected_repository_ids` only apply to organization variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name, unique within its scope
    pub name: String,
    /// Variable value
    pub value: String,
    /// When the variable was last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Organization variable visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Repository ids for `selected` visibility, in the account the variable is written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            updated_at: None,
            visibility: None,
            selected_repository_ids: None,
        }
    }

    /// Set the organization visibility.
    ///
    /// Repository ids are kept only for `selected`; an empty list still means
    /// "selected, with no repositories".
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility, repository_ids: Vec<u64>) -> Self {
        self.visibility = Some(visibility);
        self.selected_repository_ids = match visibility {
            Visibility::Selected => Some(repository_ids),
            Visibility::All | Visibility::Private => None,
        };
        self
    }
}

/// Page of variables as returned by every variables listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VariablePage {
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// The container a variable belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableScope {
    Organization(String),
    Repository(RepoRef),
    Environment { repo: RepoRef, environment: String },
}

impl VariableScope {
    pub fn organization(org: impl Into<String>) -> Self {
        Self::Organization(org.into())
    }

    pub fn environment(repo: RepoRef, environment: impl Into<String>) -> Self {
        Self::Environment {
            repo,
            environment: environment.into(),
        }
    }

    /// Whether variables in this scope carry an organization visibility.
    #[must_use]
    pub fn is_organization(&self) -> bool {
        matches!(self, Self::Organization(_))
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization(org) => write!(f, "organization {org}"),
            Self::Repository(repo) => write!(f, "repository {repo}"),
            Self::Environment { repo, environment } => {
                write!(f, "environment '{environment}' of {repo}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_variable_deserialize() {
        let json = r#"{
            "name": "USERNAME",
            "value": "octocat",
            "created_at": "2019-08-10T14:59:22Z",
            "updated_at": "2020-01-10T14:59:22Z",
            "visibility": "selected",
            "selected_repositories_url": "https://api.github.com/orgs/octo-org/actions/variables/USERNAME/repositories"
        }"#;

        let variable: Variable = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(variable.name, "USERNAME");
        assert_eq!(variable.visibility, Some(Visibility::Selected));
        assert!(variable.updated_at.is_some());
        assert!(variable.selected_repository_ids.is_none());
    }

    #[test]
    fn test_repo_variable_has_no_visibility() {
        let json = r#"{"name": "EMAIL", "value": "octocat@github.com"}"#;
        let variable: Variable = serde_json::from_str(json).expect("Should deserialize");
        assert!(variable.visibility.is_none());
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("ALL".parse::<Visibility>(), Ok(Visibility::All));
        assert_eq!("private".parse::<Visibility>(), Ok(Visibility::Private));
        assert_eq!(" selected ".parse::<Visibility>(), Ok(Visibility::Selected));
        assert!("internal".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_with_visibility_drops_ids_unless_selected() {
        let all = Variable::new("A", "1").with_visibility(Visibility::All, vec![1, 2]);
        assert_eq!(all.selected_repository_ids, None);

        let none_selected = Variable::new("A", "1").with_visibility(Visibility::Selected, vec![]);
        assert_eq!(none_selected.selected_repository_ids, Some(vec![]));
    }

    #[test]
    fn test_scope_display() {
        let repo = RepoRef::new("octo-org", "app");
        assert_eq!(VariableScope::organization("octo-org").to_string(), "organization octo-org");
        assert_eq!(VariableScope::Repository(repo.clone()).to_string(), "repository octo-org/app");
        assert_eq!(
            VariableScope::environment(repo, "prod").to_string(),
            "environment 'prod' of octo-org/app"
        );
    }
}

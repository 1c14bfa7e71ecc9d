//! Repository-related data models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Owner/name coordinates of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Platform-assigned identifier, only meaningful within one account
    pub id: u64,
    /// Repository name
    pub name: String,
    /// `owner/name`
    #[serde(default)]
    pub full_name: String,
    /// Whether the repository is private
    #[serde(default)]
    pub private: bool,
}

impl Repository {
    /// Whether this is the repository at `repo`, compared case-insensitively.
    ///
    /// A renamed or transferred repository answers under its new `full_name`.
    #[must_use]
    pub fn is_at(&self, repo: &RepoRef) -> bool {
        self.full_name.eq_ignore_ascii_case(&repo.to_string())
    }
}

/// Page of repositories as returned by the selected-repositories endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepositoryPage {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_display() {
        assert_eq!(RepoRef::new("octo-org", "hello-world").to_string(), "octo-org/hello-world");
    }

    #[test]
    fn test_repository_deserialize() {
        let json = r#"{
            "id": 1296269,
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "private": false,
            "html_url": "https://github.com/octocat/Hello-World"
        }"#;

        let repo: Repository = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(repo.id, 1_296_269);
        assert_eq!(repo.full_name, "octocat/Hello-World");
    }

    #[test]
    fn test_is_at_compares_owner_and_name() {
        let repo = Repository {
            id: 1,
            name: "Hello-World".to_string(),
            full_name: "octocat/Hello-World".to_string(),
            private: false,
        };

        assert!(repo.is_at(&RepoRef::new("OctoCat", "hello-world")));
        assert!(!repo.is_at(&RepoRef::new("octo-org", "Hello-World")));
        assert!(!repo.is_at(&RepoRef::new("octocat", "Hello-World-2")));
    }
}

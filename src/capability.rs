//! Credential capability (OAuth scope) validation.
//!
//! Classic tokens report their scopes in the `X-OAuth-Scopes` header. Broad
//! scopes imply narrower ones through a fixed, one-directional hierarchy.
//! Fine-grained tokens and workflow tokens do not report scopes at all; for
//! those validation is skipped.

use tracing::debug;

use crate::api::PlatformApi;
use crate::error::Error;
use crate::types::Side;

/// Scope required to write organization variables.
pub const ORG_SCOPE: &str = "admin:org";

/// Scope required to write repository and environment variables.
pub const REPO_SCOPE: &str = "repo";

/// Parent scopes and the narrower scopes they imply.
///
/// Entries are one-directional: holding a child never satisfies its parent.
pub const SCOPE_HIERARCHY: &[(&str, &[&str])] = &[
    ("admin:org", &["write:org", "read:org"]),
    (
        "repo",
        &["public_repo", "repo:status", "repo:deployment", "repo:invite"],
    ),
];

/// Scopes granted to a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilitySet {
    /// The credential reported its scopes
    Known(Vec<String>),
    /// The credential type does not expose scopes
    Unknown,
}

impl CapabilitySet {
    /// Parse the `X-OAuth-Scopes` header value.
    ///
    /// A missing or blank header means the scopes are unknown.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
            return Self::Unknown;
        };

        Self::Known(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Whether `required` is granted, directly or through a parent scope.
    ///
    /// Always true for `Unknown`.
    #[must_use]
    pub fn satisfies(&self, required: &str) -> bool {
        match self {
            Self::Unknown => true,
            Self::Known(granted) => has_scope(granted, required),
        }
    }
}

/// Reports whether a required scope is satisfied by any granted scope.
#[must_use]
pub fn has_scope(granted: &[String], required: &str) -> bool {
    granted
        .iter()
        .any(|s| s == required || is_parent_scope(s, required))
}

/// Reports whether `parent` is a broader scope that implies `required`.
#[must_use]
pub fn is_parent_scope(parent: &str, required: &str) -> bool {
    SCOPE_HIERARCHY
        .iter()
        .find(|(p, _)| *p == parent)
        .is_some_and(|(_, children)| children.contains(&required))
}

/// The class of mutation a migration performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Organization variables
    Organization,
    /// Repository and environment variables
    Repository,
}

impl Requirement {
    /// The scope this requirement needs.
    #[must_use]
    pub fn scope(self) -> &'static str {
        match self {
            Self::Organization => ORG_SCOPE,
            Self::Repository => REPO_SCOPE,
        }
    }

    fn purpose(self) -> &'static str {
        match self {
            Self::Organization => "organization variable migration",
            Self::Repository => "repository variable migration",
        }
    }
}

/// Check a granted scope set against a requirement.
///
/// # Errors
///
/// Returns `Error::MissingCapability` naming the missing scope and how to
/// obtain it.
pub fn check(granted: &CapabilitySet, requirement: Requirement, side: Side) -> Result<(), Error> {
    let required = requirement.scope();
    if granted.satisfies(required) {
        return Ok(());
    }

    let granted = match granted {
        CapabilitySet::Known(scopes) => scopes.clone(),
        CapabilitySet::Unknown => Vec::new(),
    };
    Err(Error::MissingCapability {
        side,
        required: required.to_string(),
        purpose: requirement.purpose().to_string(),
        granted,
        hint: format!("Please create a personal access token with the '{required}' scope"),
    })
}

/// Fetch a client's scopes and check them against a requirement.
///
/// # Errors
///
/// Returns an error if the scopes cannot be read or a scope is missing.
pub async fn validate(
    api: &dyn PlatformApi,
    requirement: Requirement,
    side: Side,
) -> Result<CapabilitySet, Error> {
    let granted = api.capabilities().await?;
    if granted == CapabilitySet::Unknown {
        debug!(side = %side, "Token does not expose scopes, skipping validation");
    }
    check(&granted, requirement, side)?;
    Ok(granted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_exact_scope() {
        assert!(has_scope(&scopes(&["repo", "workflow"]), "repo"));
        assert!(!has_scope(&scopes(&["workflow"]), "repo"));
    }

    #[test]
    fn test_parent_scope_implies_children() {
        let granted = scopes(&["admin:org"]);
        assert!(has_scope(&granted, "write:org"));
        assert!(has_scope(&granted, "read:org"));

        let granted = scopes(&["repo"]);
        for child in ["public_repo", "repo:status", "repo:deployment", "repo:invite"] {
            assert!(has_scope(&granted, child), "repo should imply {child}");
        }
    }

    #[test]
    fn test_child_scope_does_not_imply_parent() {
        assert!(!has_scope(&scopes(&["read:org", "write:org"]), "admin:org"));
        assert!(!has_scope(&scopes(&["public_repo"]), "repo"));
    }

    #[test]
    fn test_unrelated_parents_do_not_cross() {
        assert!(!has_scope(&scopes(&["admin:org"]), "repo"));
        assert!(!has_scope(&scopes(&["repo"]), "read:org"));
    }

    #[test]
    fn test_from_header() {
        assert_eq!(CapabilitySet::from_header(None), CapabilitySet::Unknown);
        assert_eq!(CapabilitySet::from_header(Some("  ")), CapabilitySet::Unknown);
        assert_eq!(
            CapabilitySet::from_header(Some("repo, admin:org,workflow")),
            CapabilitySet::Known(scopes(&["repo", "admin:org", "workflow"]))
        );
    }

    #[test]
    fn test_unknown_skips_validation() {
        assert!(check(&CapabilitySet::Unknown, Requirement::Organization, Side::Source).is_ok());
    }

    #[test]
    fn test_check_reports_missing_scope() {
        let granted = CapabilitySet::Known(scopes(&["repo"]));
        let err = check(&granted, Requirement::Organization, Side::Target)
            .expect_err("repo does not grant admin:org");

        match err {
            Error::MissingCapability {
                side,
                required,
                granted,
                ..
            } => {
                assert_eq!(side, Side::Target);
                assert_eq!(required, "admin:org");
                assert_eq!(granted, vec!["repo".to_string()]);
            }
            other => panic!("Expected MissingCapability, got: {other:?}"),
        }
    }

    #[test]
    fn test_requirement_scopes() {
        assert_eq!(Requirement::Organization.scope(), "admin:org");
        assert_eq!(Requirement::Repository.scope(), "repo");
    }
}

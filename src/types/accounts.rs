//! Account-related data models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two accounts a client or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// The user a credential authenticates as (`GET /user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Login name
    pub login: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Public email address
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Source.to_string(), "source");
        assert_eq!(Side::Target.to_string(), "target");
    }

    #[test]
    fn test_current_user_deserialize_minimal() {
        let user: CurrentUser =
            serde_json::from_str(r#"{"login": "octocat", "id": 1}"#).expect("Should deserialize");
        assert_eq!(user.login, "octocat");
        assert!(user.name.is_none());
    }
}
